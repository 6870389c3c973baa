// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded rewards database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `telegram_index`: telegram_id → account_id (unique)
//! - `referral_codes`: referral_code → account_id (unique)
//! - `referral_edges`: composite key (inviter_id|referred_id) → referred_id
//! - `ledger`: entry_id → serialized LedgerEntry
//! - `ledger_index`: composite key (account_id|!timestamp|entry_id) → category
//!
//! Every write runs in a single redb write transaction. redb serializes
//! writers, so the uniqueness checks in [`RewardsDb::create_account`] and the
//! balance update in [`RewardsDb::apply_credit`] cannot interleave with
//! another writer.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::models::Account;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: account_id → serialized Account (JSON bytes).
pub(super) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Unique index: Telegram user id → account_id.
pub(super) const TELEGRAM_INDEX: TableDefinition<i64, &str> =
    TableDefinition::new("telegram_index");

/// Unique index: referral code → account_id.
pub(super) const REFERRAL_CODES: TableDefinition<&str, &str> =
    TableDefinition::new("referral_codes");

/// Referral edges. Key format: `inviter_id|referred_id`.
pub(super) const REFERRAL_EDGES: TableDefinition<&[u8], &str> =
    TableDefinition::new("referral_edges");

/// Ledger entries: entry_id → serialized LedgerEntry (JSON bytes).
pub(super) const LEDGER: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger");

/// Per-account ledger index → category name.
/// Key format: `account_id|!timestamp_be|entry_id` for newest-first scans.
pub(super) const LEDGER_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("ledger_index");

// =============================================================================
// Error Type
// =============================================================================

/// Column protected by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    AccountId,
    TelegramId,
    ReferralCode,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::AccountId => f.write_str("account id"),
            UniqueField::TelegramId => f.write_str("telegram id"),
            UniqueField::ReferralCode => f.write_str("referral code"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(UniqueField),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance for {account_id}: {balance}, change {amount}")]
    InsufficientBalance {
        account_id: Uuid,
        balance: rust_decimal::Decimal,
        amount: rust_decimal::Decimal,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Key Helpers
// =============================================================================

/// Build a composite key `owner|inverted_timestamp_be|id`.
///
/// The inverted timestamp makes a forward scan return newest entries first.
pub(super) fn make_timeline_key(owner: &Uuid, timestamp_micros: i64, id: &Uuid) -> Vec<u8> {
    let owner = owner.to_string();
    let id = id.to_string();
    let mut key = Vec::with_capacity(owner.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!(timestamp_micros as u64)).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Build the composite key `inviter|referred` of a referral edge.
pub(super) fn make_edge_key(inviter: &Uuid, referred: &Uuid) -> Vec<u8> {
    format!("{inviter}|{referred}").into_bytes()
}

/// Half-open range `[owner|, owner})` covering every composite key of `owner`.
///
/// `}` is the byte following `|`, so the upper bound sorts after any key
/// that starts with `owner|`.
pub(super) fn owner_range(owner: &Uuid) -> (Vec<u8>, Vec<u8>) {
    let owner = owner.to_string();
    let mut start = Vec::with_capacity(owner.len() + 1);
    start.extend_from_slice(owner.as_bytes());
    start.push(b'|');
    let mut end = start.clone();
    if let Some(last) = end.last_mut() {
        *last = b'}';
    }
    (start, end)
}

/// Extract the trailing id from a composite key (text after the last `|`).
pub(super) fn trailing_id(key: &[u8]) -> Option<Uuid> {
    let pos = key.iter().rposition(|&b| b == b'|')?;
    let text = std::str::from_utf8(&key[pos + 1..]).ok()?;
    Uuid::parse_str(text).ok()
}

/// Read and deserialize an account from any readable accounts table.
pub(super) fn read_account<T>(table: &T, account_id: &str) -> StorageResult<Option<Account>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(account_id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

// =============================================================================
// RewardsDb
// =============================================================================

/// Embedded ACID rewards database.
pub struct RewardsDb {
    pub(super) db: Database,
}

impl RewardsDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(TELEGRAM_INDEX)?;
            let _ = write_txn.open_table(REFERRAL_CODES)?;
            let _ = write_txn.open_table(REFERRAL_EDGES)?;
            let _ = write_txn.open_table(LEDGER)?;
            let _ = write_txn.open_table(LEDGER_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }
}
