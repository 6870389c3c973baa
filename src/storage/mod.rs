// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Rewards Storage Module
//!
//! Persistent state lives in a single embedded redb database
//! (`$DATA_DIR/rewards.redb`). The database is the only place where the
//! invariants of the rewards model are enforced:
//!
//! - `telegram_id` and `referral_code` are unique across accounts
//! - `referred_by` points at an existing, different account
//! - a ledger entry and the matching balance update commit together
//!
//! ## Collaborator Contracts
//!
//! The provisioning flow depends on the two traits below rather than on
//! [`RewardsDb`] directly, so tests can substitute failing or instrumented
//! implementations.

pub mod accounts;
pub mod database;
pub mod leaderboard;
pub mod ledger;

pub use database::{RewardsDb, StorageError, StorageResult, UniqueField};
pub use leaderboard::{LeaderboardCache, LeaderboardRefresher, LEADERBOARD_SIZE};

use crate::models::{Account, CreditRequest, LedgerEntry};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "rewards.redb";

/// Account lookup and insert, keyed by Telegram id and referral code.
pub trait AccountStore: Send + Sync {
    fn find_by_telegram_id(&self, telegram_id: i64) -> StorageResult<Option<Account>>;

    /// Exact, case-sensitive match.
    fn find_by_referral_code(&self, code: &str) -> StorageResult<Option<Account>>;

    /// Insert a new account, enforcing the uniqueness constraints.
    fn insert_account(&self, account: &Account) -> StorageResult<()>;
}

/// Atomic "append ledger entry and update balance" operation.
pub trait LedgerCredit: Send + Sync {
    fn credit(&self, request: &CreditRequest) -> StorageResult<LedgerEntry>;
}

impl AccountStore for RewardsDb {
    fn find_by_telegram_id(&self, telegram_id: i64) -> StorageResult<Option<Account>> {
        self.account_by_telegram_id(telegram_id)
    }

    fn find_by_referral_code(&self, code: &str) -> StorageResult<Option<Account>> {
        self.account_by_referral_code(code)
    }

    fn insert_account(&self, account: &Account) -> StorageResult<()> {
        self.create_account(account)
    }
}

impl LedgerCredit for RewardsDb {
    fn credit(&self, request: &CreditRequest) -> StorageResult<LedgerEntry> {
        self.apply_credit(request)
    }
}
