// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Points ledger.
//!
//! [`RewardsDb::apply_credit`] appends a ledger entry and updates the owning
//! account's `balance` / `total_earned` in the same write transaction, so
//! either both become visible or neither does.

use chrono::Utc;
use redb::ReadableDatabase;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::database::{
    make_timeline_key, owner_range, read_account, trailing_id, RewardsDb, StorageError,
    StorageResult, ACCOUNTS, LEDGER, LEDGER_INDEX,
};
use crate::models::{CreditRequest, LedgerCategory, LedgerEntry, AMOUNT_SCALE};

impl RewardsDb {
    /// Apply a signed amount to an account and record it in the ledger.
    ///
    /// `balance += amount`, `total_earned += max(amount, 0)`. Amounts are
    /// rounded to two decimal places. A zero amount or one that would make the
    /// balance negative is rejected without writing anything.
    pub fn apply_credit(&self, request: &CreditRequest) -> StorageResult<LedgerEntry> {
        let amount = request.amount.round_dp(AMOUNT_SCALE);
        if amount.is_zero() {
            return Err(StorageError::InvalidAmount(
                "ledger amount must be non-zero".to_string(),
            ));
        }

        let account_key = request.account_id.to_string();

        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account = read_account(&accounts, &account_key)?
                .ok_or_else(|| StorageError::NotFound(format!("Account {account_key}")))?;

            let balance = account
                .balance
                .checked_add(amount)
                .ok_or_else(|| StorageError::InvalidAmount(format!("{amount} overflows balance")))?;
            if balance < Decimal::ZERO {
                return Err(StorageError::InsufficientBalance {
                    account_id: request.account_id,
                    balance: account.balance,
                    amount,
                });
            }

            account.balance = balance;
            if amount > Decimal::ZERO {
                account.total_earned = account.total_earned.checked_add(amount).ok_or_else(|| {
                    StorageError::InvalidAmount(format!("{amount} overflows total earned"))
                })?;
            }
            account.updated_at = Utc::now();

            let entry = LedgerEntry {
                id: Uuid::new_v4(),
                account_id: request.account_id,
                amount,
                category: request.category,
                description: request.description.clone(),
                metadata: request.metadata.clone(),
                created_at: account.updated_at,
            };

            let account_json = serde_json::to_vec(&account)?;
            accounts.insert(account_key.as_str(), account_json.as_slice())?;

            let entry_key = entry.id.to_string();
            let entry_json = serde_json::to_vec(&entry)?;
            let mut ledger = write_txn.open_table(LEDGER)?;
            ledger.insert(entry_key.as_str(), entry_json.as_slice())?;

            let mut index = write_txn.open_table(LEDGER_INDEX)?;
            let index_key = make_timeline_key(
                &entry.account_id,
                entry.created_at.timestamp_micros(),
                &entry.id,
            );
            index.insert(index_key.as_slice(), entry.category.as_str())?;

            entry
        };
        write_txn.commit()?;

        tracing::debug!(
            account_id = %entry.account_id,
            entry_id = %entry.id,
            category = %entry.category,
            amount = %entry.amount,
            "Ledger credit applied"
        );

        Ok(entry)
    }

    /// Ledger entries of an account, newest first.
    pub fn ledger_entries(
        &self,
        account_id: &Uuid,
        limit: usize,
    ) -> StorageResult<Vec<LedgerEntry>> {
        self.scan_ledger(account_id, None, limit)
    }

    /// Sum of all entry amounts of one category for an account.
    pub fn ledger_total(
        &self,
        account_id: &Uuid,
        category: LedgerCategory,
    ) -> StorageResult<Decimal> {
        let entries = self.scan_ledger(account_id, Some(category), usize::MAX)?;
        Ok(entries.iter().map(|entry| entry.amount).sum())
    }

    fn scan_ledger(
        &self,
        account_id: &Uuid,
        category: Option<LedgerCategory>,
        limit: usize,
    ) -> StorageResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(LEDGER_INDEX)?;
        let ledger = read_txn.open_table(LEDGER)?;
        let (start, end) = owner_range(account_id);

        let mut entries = Vec::new();
        for item in index.range(start.as_slice()..end.as_slice())? {
            if entries.len() >= limit {
                break;
            }

            let (key, value) = item?;
            if let Some(wanted) = category {
                if value.value() != wanted.as_str() {
                    continue;
                }
            }

            let Some(entry_id) = trailing_id(key.value()) else {
                tracing::warn!(account_id = %account_id, "Skipping malformed ledger index key");
                continue;
            };

            if let Some(stored) = ledger.get(entry_id.to_string().as_str())? {
                entries.push(serde_json::from_slice(stored.value())?);
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, NewAccount};

    fn temp_db() -> (RewardsDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = RewardsDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn seeded_account(db: &RewardsDb) -> Account {
        let account = Account::new(
            NewAccount {
                telegram_id: Some(1),
                ..Default::default()
            },
            "LEDGER01",
        );
        db.create_account(&account).unwrap();
        account
    }

    fn points(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn credit_updates_balance_and_total_earned() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);

        let entry = db
            .apply_credit(
                &CreditRequest::new(account.id, points(10), LedgerCategory::AdReward)
                    .with_description("Watched rewarded ad"),
            )
            .unwrap();
        assert_eq!(entry.amount, points(10));
        assert_eq!(entry.description.as_deref(), Some("Watched rewarded ad"));

        let stored = db.account(&account.id).unwrap().unwrap();
        assert_eq!(stored.balance, points(10));
        assert_eq!(stored.total_earned, points(10));
    }

    #[test]
    fn debit_lowers_balance_but_not_total_earned() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);

        db.apply_credit(&CreditRequest::new(account.id, points(50), LedgerCategory::TaskReward))
            .unwrap();
        db.apply_credit(&CreditRequest::new(account.id, points(-20), LedgerCategory::Withdrawal))
            .unwrap();

        let stored = db.account(&account.id).unwrap().unwrap();
        assert_eq!(stored.balance, points(30));
        assert_eq!(stored.total_earned, points(50));
    }

    #[test]
    fn overdraft_is_rejected_atomically() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);
        db.apply_credit(&CreditRequest::new(account.id, points(5), LedgerCategory::TaskReward))
            .unwrap();

        let withdrawal = CreditRequest::new(account.id, points(-6), LedgerCategory::Withdrawal);
        let result = db.apply_credit(&withdrawal);
        assert!(matches!(
            result,
            Err(StorageError::InsufficientBalance { .. })
        ));

        let stored = db.account(&account.id).unwrap().unwrap();
        assert_eq!(stored.balance, points(5));
        assert_eq!(db.ledger_entries(&account.id, 10).unwrap().len(), 1);
    }

    #[test]
    fn zero_amount_and_missing_account_are_rejected() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);

        let zero = CreditRequest::new(account.id, Decimal::ZERO, LedgerCategory::TaskReward);
        assert!(matches!(
            db.apply_credit(&zero),
            Err(StorageError::InvalidAmount(_))
        ));
        let orphan = CreditRequest::new(Uuid::new_v4(), points(1), LedgerCategory::TaskReward);
        assert!(matches!(
            db.apply_credit(&orphan),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn amounts_are_rounded_to_cents() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);

        let entry = db
            .apply_credit(&CreditRequest::new(
                account.id,
                Decimal::new(12345, 3),
                LedgerCategory::TaskReward,
            ))
            .unwrap();
        assert_eq!(entry.amount, Decimal::new(1234, 2));
    }

    #[test]
    fn entries_listed_newest_first_with_limit() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);

        for value in 1..=4 {
            db.apply_credit(&CreditRequest::new(
                account.id,
                points(value),
                LedgerCategory::TaskReward,
            ))
            .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let entries = db.ledger_entries(&account.id, 3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].amount, points(4));
        assert_eq!(entries[1].amount, points(3));
        assert_eq!(entries[2].amount, points(2));
    }

    #[test]
    fn ledger_total_filters_by_category() {
        let (db, _dir) = temp_db();
        let account = seeded_account(&db);

        db.apply_credit(&CreditRequest::new(account.id, points(5), LedgerCategory::ReferralBonus))
            .unwrap();
        db.apply_credit(&CreditRequest::new(account.id, points(10), LedgerCategory::AdReward))
            .unwrap();
        db.apply_credit(&CreditRequest::new(account.id, points(5), LedgerCategory::ReferralBonus))
            .unwrap();

        assert_eq!(
            db.ledger_total(&account.id, LedgerCategory::ReferralBonus).unwrap(),
            points(10)
        );
        assert_eq!(
            db.ledger_total(&account.id, LedgerCategory::Withdrawal).unwrap(),
            Decimal::ZERO
        );
    }
}
