// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Provisioning
//!
//! Turns a verified Telegram identity into a rewards account:
//!
//! - existing Telegram ids resolve to the stored account with no writes
//! - new ids get an account with a fresh referral code, optionally linked to
//!   the inviter whose code was supplied
//! - linked signups credit the inviter with the referral bonus
//!
//! The bonus credit runs after the account is committed. If it fails the
//! signup still succeeds; the failure is logged and surfaced as a
//! [`ProvisioningWarning`]. There is no automatic retry.

pub mod referral;
pub mod resolver;

pub use referral::{generate_referral_code, new_referral_code, ReferralLinker};
pub use resolver::{IdentityResolver, Resolution};

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no unique referral code after {0} attempts")]
    ReferralCodeExhausted(usize),

    #[error("system random number generator failed")]
    Rng,
}

/// Non-fatal problems reported alongside a successful signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningWarning {
    /// The inviter was linked but the bonus credit did not commit.
    ReferralBonusFailed,
    /// The referral code could not be looked up; the account is unlinked.
    ReferralLookupFailed,
}
