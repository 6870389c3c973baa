// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module authenticates Telegram Mini App users from WebApp init data.
//!
//! ## Auth Flow
//!
//! 1. Telegram hands the Mini App a signed `initData` query string
//! 2. The client sends it either in the sign-in body or as
//!    `Authorization: tma <initData>`
//! 3. The server:
//!    - Recomputes the HMAC-SHA256 signature with the bot token
//!    - Optionally checks `auth_date` against a maximum age
//!    - Extracts the `user` JSON → [`TelegramUser`]
//!
//! ## Security
//!
//! - The Telegram id is only ever taken from a verified payload
//! - Signature comparison is constant time
//! - Verification can be bypassed only outside production, and only when
//!   explicitly requested (see [`crate::config`])

pub mod error;
pub mod extractor;
pub mod init_data;
pub mod telegram;

pub use error::AuthError;
pub use extractor::{OptionalTelegramAuth, TelegramAuth};
pub use init_data::{InitDataVerifier, VerificationMode};
pub use telegram::{TelegramUser, VerifiedInitData};
