// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Records persisted by the rewards database and returned by the REST API.
//! All types derive `Serialize`, `Deserialize`, and `ToSchema` for JSON
//! handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Accounts**: one per Telegram user, carrying the points balance and
//!   the referral attributes
//! - **Ledger entries**: immutable balance movements (rewards, bonuses,
//!   withdrawals)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Decimal places kept for balances and ledger amounts.
pub const AMOUNT_SCALE: u32 = 2;

// =============================================================================
// Account
// =============================================================================

/// A rewards account.
///
/// Created exactly once on the first successful sign-in of a Telegram user.
/// `balance` and `total_earned` only change through ledger credits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Account {
    /// Internal account identifier.
    pub id: Uuid,
    /// Telegram user id. Absent for accounts created by another login path.
    pub telegram_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Avatar URL as reported by Telegram.
    pub photo_url: Option<String>,
    /// Spendable points. Never negative.
    pub balance: Decimal,
    /// Lifetime sum of positive credits.
    pub total_earned: Decimal,
    /// Code other users enter to be attributed to this account.
    pub referral_code: String,
    /// Inviter account, fixed at creation.
    pub referred_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields used to create an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAccount {
    pub telegram_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub referred_by: Option<Uuid>,
}

impl Account {
    /// Build a fresh zero-balance account with the given referral code.
    pub fn new(profile: NewAccount, referral_code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            telegram_id: profile.telegram_id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            photo_url: profile.photo_url,
            balance: Decimal::ZERO,
            total_earned: Decimal::ZERO,
            referral_code: referral_code.into(),
            referred_by: profile.referred_by,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Closed set of ledger entry categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCategory {
    TaskReward,
    AdReward,
    ReferralBonus,
    Withdrawal,
}

impl LedgerCategory {
    /// Stable wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::TaskReward => "task_reward",
            LedgerCategory::AdReward => "ad_reward",
            LedgerCategory::ReferralBonus => "referral_bonus",
            LedgerCategory::Withdrawal => "withdrawal",
        }
    }
}

impl std::fmt::Display for LedgerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// Account whose balance the entry moved.
    pub account_id: Uuid,
    /// Signed amount; negative for withdrawals.
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub category: LedgerCategory,
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Input of the atomic ledger credit operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditRequest {
    pub account_id: Uuid,
    pub amount: Decimal,
    pub category: LedgerCategory,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
}

impl CreditRequest {
    pub fn new(account_id: Uuid, amount: Decimal, category: LedgerCategory) -> Self {
        Self {
            account_id,
            amount,
            category,
            description: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// =============================================================================
// Leaderboard
// =============================================================================

/// One row of the leaderboard ranking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub telegram_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub photo_url: Option<String>,
    pub total_earned: Decimal,
    /// 1-based position.
    pub rank: u32,
}
