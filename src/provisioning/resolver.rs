// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Telegram identity → rewards account.

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::{new_referral_code, ProvisioningError, ProvisioningWarning, ReferralLinker};
use crate::auth::TelegramUser;
use crate::models::{Account, CreditRequest, LedgerCategory, NewAccount};
use crate::storage::{AccountStore, LedgerCredit, StorageError, UniqueField};

/// Insert attempts before giving up on referral code collisions.
pub const MAX_REFERRAL_CODE_ATTEMPTS: usize = 5;

pub const REFERRAL_BONUS_DESCRIPTION: &str = "Referral bonus";

/// Outcome of resolving a Telegram identity.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub account: Account,
    /// `true` when this call inserted the account.
    pub created: bool,
    pub warnings: Vec<ProvisioningWarning>,
}

impl Resolution {
    fn existing(account: Account) -> Self {
        Self {
            account,
            created: false,
            warnings: Vec::new(),
        }
    }
}

/// Finds or creates the account for a verified Telegram user.
pub struct IdentityResolver<'a> {
    accounts: &'a dyn AccountStore,
    ledger: &'a dyn LedgerCredit,
    referral_bonus: Decimal,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        accounts: &'a dyn AccountStore,
        ledger: &'a dyn LedgerCredit,
        referral_bonus: Decimal,
    ) -> Self {
        Self {
            accounts,
            ledger,
            referral_bonus,
        }
    }

    /// Resolve `user` to an account, creating it on first sight.
    ///
    /// Fails only when the account itself cannot be read or written.
    /// Profile fields of an existing account are never updated here.
    pub fn resolve(
        &self,
        user: &TelegramUser,
        referral_code: Option<&str>,
    ) -> Result<Resolution, ProvisioningError> {
        if let Some(account) = self.accounts.find_by_telegram_id(user.id)? {
            debug!(telegram_id = user.id, account_id = %account.id, "Resolved existing account");
            return Ok(Resolution::existing(account));
        }

        let mut warnings = Vec::new();
        let inviter = match referral_code.filter(|code| !code.is_empty()) {
            None => None,
            Some(code) => match ReferralLinker::new(self.accounts).find_inviter(code) {
                Ok(inviter) => inviter,
                Err(e) => {
                    warn!(
                        error = %e,
                        referral_code = %code,
                        "Referral lookup failed, continuing unlinked"
                    );
                    warnings.push(ProvisioningWarning::ReferralLookupFailed);
                    None
                }
            },
        };

        let profile = NewAccount {
            telegram_id: Some(user.id),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            photo_url: user.photo_url.clone(),
            referred_by: inviter.as_ref().map(|a| a.id),
        };

        let account = match self.insert_with_fresh_code(profile)? {
            Inserted::Created(account) => account,
            Inserted::LostRace(existing) => return Ok(Resolution::existing(existing)),
        };

        info!(
            account_id = %account.id,
            telegram_id = user.id,
            referred_by = ?account.referred_by,
            "Account created"
        );

        if let Some(inviter) = inviter {
            if let Err(warning) = self.credit_inviter(&inviter, &account) {
                warnings.push(warning);
            }
        }

        Ok(Resolution {
            account,
            created: true,
            warnings,
        })
    }

    fn insert_with_fresh_code(&self, profile: NewAccount) -> Result<Inserted, ProvisioningError> {
        for attempt in 1..=MAX_REFERRAL_CODE_ATTEMPTS {
            let account = Account::new(profile.clone(), new_referral_code()?);
            match self.accounts.insert_account(&account) {
                Ok(()) => return Ok(Inserted::Created(account)),
                Err(StorageError::UniqueViolation(UniqueField::ReferralCode)) => {
                    warn!(attempt, "Referral code collision, regenerating");
                }
                Err(StorageError::UniqueViolation(UniqueField::TelegramId)) => {
                    // A concurrent request created this user first
                    let telegram_id = profile.telegram_id.unwrap_or_default();
                    return match self.accounts.find_by_telegram_id(telegram_id)? {
                        Some(existing) => Ok(Inserted::LostRace(existing)),
                        None => Err(StorageError::UniqueViolation(UniqueField::TelegramId).into()),
                    };
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ProvisioningError::ReferralCodeExhausted(MAX_REFERRAL_CODE_ATTEMPTS))
    }

    fn credit_inviter(
        &self,
        inviter: &Account,
        referred: &Account,
    ) -> Result<(), ProvisioningWarning> {
        if self.referral_bonus <= Decimal::ZERO {
            return Ok(());
        }

        let request = CreditRequest::new(
            inviter.id,
            self.referral_bonus,
            LedgerCategory::ReferralBonus,
        )
        .with_description(REFERRAL_BONUS_DESCRIPTION)
        .with_metadata(json!({ "referred_user_id": referred.id }));

        match self.ledger.credit(&request) {
            Ok(entry) => {
                debug!(entry_id = %entry.id, inviter_id = %inviter.id, "Referral bonus credited");
                Ok(())
            }
            Err(e) => {
                error!(
                    error = %e,
                    inviter_id = %inviter.id,
                    referred_id = %referred.id,
                    amount = %self.referral_bonus,
                    "Referral bonus credit failed; needs reconciliation"
                );
                Err(ProvisioningWarning::ReferralBonusFailed)
            }
        }
    }
}

enum Inserted {
    Created(Account),
    LostRace(Account),
}
