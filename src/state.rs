// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::InitDataVerifier;
use crate::config::{AppConfig, RewardSettings};
use crate::storage::{LeaderboardCache, RewardsDb};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RewardsDb>,
    pub verifier: Arc<InitDataVerifier>,
    pub rewards: RewardSettings,
    pub leaderboard: Arc<LeaderboardCache>,
}

impl AppState {
    pub fn new(db: RewardsDb, verifier: InitDataVerifier) -> Self {
        Self {
            db: Arc::new(db),
            verifier: Arc::new(verifier),
            rewards: RewardSettings::default(),
            leaderboard: Arc::new(LeaderboardCache::new(Duration::from_secs(60))),
        }
    }

    /// Build the state described by a loaded configuration.
    pub fn from_config(db: RewardsDb, config: &AppConfig) -> Self {
        Self::new(db, config.verifier())
            .with_rewards(config.rewards.clone())
            .with_leaderboard_ttl(config.leaderboard_refresh)
    }

    pub fn with_rewards(mut self, rewards: RewardSettings) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_leaderboard_ttl(mut self, ttl: Duration) -> Self {
        self.leaderboard = Arc::new(LeaderboardCache::new(ttl));
        self
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::{init_data::sign_fields, VerificationMode};
    use tempfile::TempDir;

    pub const TEST_BOT_TOKEN: &str = "123456:TEST-BOT-TOKEN";

    /// State backed by a fresh database in a temp dir, verifying signatures.
    pub fn test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = RewardsDb::open(&temp_dir.path().join("rewards.redb"))
            .expect("Failed to open database");
        let verifier = InitDataVerifier::new(TEST_BOT_TOKEN, VerificationMode::Enforced);
        (AppState::new(db, verifier), temp_dir)
    }

    /// Signed init data carrying the given user JSON.
    pub fn signed_init_data(user_json: &str) -> String {
        sign_fields(
            &[
                ("auth_date", "1700000000"),
                ("query_id", "AAHtest"),
                ("user", user_json),
            ],
            TEST_BOT_TOKEN,
        )
    }

    /// `Authorization` header value for a Telegram user id.
    pub fn tma_header(telegram_id: i64) -> String {
        format!("tma {}", signed_init_data(&format!(r#"{{"id":{telegram_id}}}"#)))
    }
}
