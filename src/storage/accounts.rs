// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account persistence: creation with uniqueness enforcement and lookups by
//! id, Telegram id and referral code.

use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata};
use uuid::Uuid;

use super::database::{
    make_edge_key, owner_range, read_account, RewardsDb, StorageError, StorageResult, UniqueField,
    ACCOUNTS, REFERRAL_CODES, REFERRAL_EDGES, TELEGRAM_INDEX,
};
use crate::models::{Account, LeaderboardEntry};

impl RewardsDb {
    /// Insert a new account.
    ///
    /// Fails with [`StorageError::UniqueViolation`] when the id, Telegram id or
    /// referral code is taken, and with [`StorageError::InvalidReference`] when
    /// `referred_by` names a missing account or the account itself. Nothing is
    /// written on failure.
    pub fn create_account(&self, account: &Account) -> StorageResult<()> {
        if account.referred_by == Some(account.id) {
            return Err(StorageError::InvalidReference(format!(
                "Account {} cannot refer itself",
                account.id
            )));
        }

        let account_id = account.id.to_string();
        let json = serde_json::to_vec(account)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            if accounts.get(account_id.as_str())?.is_some() {
                return Err(StorageError::UniqueViolation(UniqueField::AccountId));
            }

            if let Some(inviter) = account.referred_by {
                if accounts.get(inviter.to_string().as_str())?.is_none() {
                    return Err(StorageError::InvalidReference(format!(
                        "Referrer {inviter} does not exist"
                    )));
                }
            }

            let mut telegram_index = write_txn.open_table(TELEGRAM_INDEX)?;
            if let Some(telegram_id) = account.telegram_id {
                if telegram_index.get(telegram_id)?.is_some() {
                    return Err(StorageError::UniqueViolation(UniqueField::TelegramId));
                }
                telegram_index.insert(telegram_id, account_id.as_str())?;
            }

            let mut codes = write_txn.open_table(REFERRAL_CODES)?;
            if codes.get(account.referral_code.as_str())?.is_some() {
                return Err(StorageError::UniqueViolation(UniqueField::ReferralCode));
            }
            codes.insert(account.referral_code.as_str(), account_id.as_str())?;

            accounts.insert(account_id.as_str(), json.as_slice())?;

            if let Some(inviter) = account.referred_by {
                let mut edges = write_txn.open_table(REFERRAL_EDGES)?;
                let key = make_edge_key(&inviter, &account.id);
                edges.insert(key.as_slice(), account_id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an account by internal id.
    pub fn account(&self, account_id: &Uuid) -> StorageResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let accounts = read_txn.open_table(ACCOUNTS)?;
        read_account(&accounts, &account_id.to_string())
    }

    /// Look up an account by Telegram user id.
    pub fn account_by_telegram_id(&self, telegram_id: i64) -> StorageResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TELEGRAM_INDEX)?;
        let account_id = match index.get(telegram_id)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let accounts = read_txn.open_table(ACCOUNTS)?;
        read_account(&accounts, &account_id)
    }

    /// Look up an account by referral code. Exact, case-sensitive match.
    pub fn account_by_referral_code(&self, code: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(REFERRAL_CODES)?;
        let account_id = match codes.get(code)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let accounts = read_txn.open_table(ACCOUNTS)?;
        read_account(&accounts, &account_id)
    }

    /// Number of accounts attributed to `inviter`.
    pub fn referral_count(&self, inviter: &Uuid) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let edges = read_txn.open_table(REFERRAL_EDGES)?;
        let (start, end) = owner_range(inviter);

        let mut count = 0u64;
        for entry in edges.range(start.as_slice()..end.as_slice())? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Total number of accounts.
    pub fn account_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let accounts = read_txn.open_table(ACCOUNTS)?;
        Ok(accounts.len()?)
    }

    /// Rank accounts by lifetime earnings.
    ///
    /// Ordered by `total_earned` descending, ties broken by creation time, and
    /// row-numbered from 1. At most `limit` rows are returned.
    pub fn top_earners(&self, limit: usize) -> StorageResult<Vec<LeaderboardEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;

        let mut accounts = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let account: Account = serde_json::from_slice(value.value())?;
            accounts.push(account);
        }

        accounts.sort_by(|a, b| {
            b.total_earned
                .cmp(&a.total_earned)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(accounts
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(position, account)| LeaderboardEntry {
                id: account.id,
                telegram_id: account.telegram_id,
                username: account.username,
                first_name: account.first_name,
                photo_url: account.photo_url,
                total_earned: account.total_earned,
                rank: position as u32 + 1,
            })
            .collect())
    }
}
