// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Leaderboard snapshot cache.
//!
//! The ranking is computed from a full scan of the accounts table, so it is
//! kept as a snapshot and refreshed on a TTL (and by the background
//! [`LeaderboardRefresher`]) rather than on every read.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{RewardsDb, StorageResult};
use crate::models::LeaderboardEntry;

/// Number of ranked rows kept in a snapshot.
pub const LEADERBOARD_SIZE: usize = 100;

/// Cached ranking plus the instant it was computed.
struct Snapshot {
    entries: Arc<Vec<LeaderboardEntry>>,
    refreshed_at: Instant,
}

/// In-process cache of the top earners ranking.
pub struct LeaderboardCache {
    snapshot: Mutex<Option<Snapshot>>,
    ttl: Duration,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            snapshot: Mutex::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current ranking, recomputed when missing or older than the TTL.
    pub fn entries(&self, db: &RewardsDb) -> StorageResult<Arc<Vec<LeaderboardEntry>>> {
        if let Ok(guard) = self.snapshot.lock() {
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.refreshed_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&snapshot.entries));
                }
            }
        }
        self.refresh(db)
    }

    /// Recompute the ranking and replace the snapshot.
    pub fn refresh(&self, db: &RewardsDb) -> StorageResult<Arc<Vec<LeaderboardEntry>>> {
        let entries = Arc::new(db.top_earners(LEADERBOARD_SIZE)?);
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = Some(Snapshot {
                entries: Arc::clone(&entries),
                refreshed_at: Instant::now(),
            });
        }
        Ok(entries)
    }
}

/// Background task that keeps the leaderboard snapshot warm.
pub struct LeaderboardRefresher {
    db: Arc<RewardsDb>,
    cache: Arc<LeaderboardCache>,
}

impl LeaderboardRefresher {
    pub fn new(db: Arc<RewardsDb>, cache: Arc<LeaderboardCache>) -> Self {
        Self { db, cache }
    }

    /// Run the refresh loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        let interval = self.cache.ttl();
        info!(interval_secs = interval.as_secs(), "Leaderboard refresher starting");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.cache.refresh(&self.db) {
                Ok(entries) => tracing::debug!(rows = entries.len(), "Leaderboard refreshed"),
                Err(e) => warn!(error = %e, "Leaderboard refresh failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Leaderboard refresher shutting down");
    }
}
