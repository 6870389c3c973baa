// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Referral codes and inviter lookup.

use ring::rand::{SecureRandom, SystemRandom};

use super::ProvisioningError;
use crate::models::Account;
use crate::storage::{AccountStore, StorageResult};

/// Random bytes per referral code (8 hex characters).
pub const REFERRAL_CODE_BYTES: usize = 4;

/// Generate a referral code: random bytes from the OS CSPRNG, upper-case hex.
pub fn generate_referral_code(rng: &dyn SecureRandom) -> Result<String, ProvisioningError> {
    let mut bytes = [0u8; REFERRAL_CODE_BYTES];
    rng.fill(&mut bytes).map_err(|_| ProvisioningError::Rng)?;
    Ok(hex::encode_upper(bytes))
}

/// Default generator backed by [`SystemRandom`].
pub fn new_referral_code() -> Result<String, ProvisioningError> {
    generate_referral_code(&SystemRandom::new())
}

/// Resolves referral codes to inviter accounts.
pub struct ReferralLinker<'a> {
    accounts: &'a dyn AccountStore,
}

impl<'a> ReferralLinker<'a> {
    pub fn new(accounts: &'a dyn AccountStore) -> Self {
        Self { accounts }
    }

    /// Find the account owning `code`.
    ///
    /// Exact, case-sensitive match. An unknown code is `Ok(None)`, not an
    /// error.
    pub fn find_inviter(&self, code: &str) -> StorageResult<Option<Account>> {
        if code.is_empty() {
            return Ok(None);
        }
        let inviter = self.accounts.find_by_referral_code(code)?;
        if inviter.is_none() {
            tracing::debug!(referral_code = %code, "Referral code not found");
        }
        Ok(inviter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::storage::RewardsDb;

    #[test]
    fn codes_are_upper_hex_of_fixed_length() {
        for _ in 0..32 {
            let code = new_referral_code().unwrap();
            assert_eq!(code.len(), REFERRAL_CODE_BYTES * 2);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }

    #[test]
    fn linker_matches_exact_code_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = RewardsDb::open(&dir.path().join("test.redb")).unwrap();
        let inviter = Account::new(
            NewAccount {
                telegram_id: Some(1),
                ..Default::default()
            },
            "ABC123",
        );
        db.create_account(&inviter).unwrap();

        let linker = ReferralLinker::new(&db);
        assert_eq!(linker.find_inviter("ABC123").unwrap().unwrap().id, inviter.id);
        assert!(linker.find_inviter("abc123").unwrap().is_none());
        assert!(linker.find_inviter("ABC12").unwrap().is_none());
        assert!(linker.find_inviter("").unwrap().is_none());
    }
}
