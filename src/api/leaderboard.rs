// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::extract::ApiQuery;
use crate::{
    auth::OptionalTelegramAuth, error::ApiError, models::LeaderboardEntry, state::AppState,
    storage::LEADERBOARD_SIZE,
};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Rows to return (default 50, max 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserRank {
    pub rank: u32,
    pub total_earned: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Caller's position; null when unauthenticated or outside the ranking
    pub user_rank: Option<UserRank>,
}

/// Top earners. Authentication is optional and only adds `user_rank`.
#[utoipa::path(
    get,
    path = "/v1/leaderboard",
    params(LeaderboardQuery),
    tag = "Leaderboard",
    responses((status = 200, body = LeaderboardResponse))
)]
pub async fn get_leaderboard(
    OptionalTelegramAuth(user): OptionalTelegramAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, LEADERBOARD_SIZE);

    let ranking = state.leaderboard.entries(&state.db)?;

    let user_rank = user.and_then(|user| {
        ranking
            .iter()
            .find(|entry| entry.telegram_id == Some(user.id))
            .map(|entry| UserRank {
                rank: entry.rank,
                total_earned: entry.total_earned,
            })
    });

    Ok(Json(LeaderboardResponse {
        leaderboard: ranking.iter().take(limit).cloned().collect(),
        user_rank,
    }))
}
