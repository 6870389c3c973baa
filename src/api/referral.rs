// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::account_for;
use crate::{auth::TelegramAuth, error::ApiError, models::LedgerCategory, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ReferralStatsResponse {
    /// Code to share with invitees
    pub referral_code: String,
    /// Accounts created with this code
    pub referral_count: u64,
    /// Sum of referral bonuses received
    pub total_earnings: Decimal,
}

#[utoipa::path(
    get,
    path = "/v1/referral/stats",
    tag = "Referral",
    security(("tma" = [])),
    responses(
        (status = 200, body = ReferralStatsResponse),
        (status = 401, description = "Invalid init data"),
        (status = 404, description = "No account for this Telegram user")
    )
)]
pub async fn referral_stats(
    TelegramAuth(user): TelegramAuth,
    State(state): State<AppState>,
) -> Result<Json<ReferralStatsResponse>, ApiError> {
    let account = account_for(&state, &user)?;
    let referral_count = state.db.referral_count(&account.id)?;
    let total_earnings = state
        .db
        .ledger_total(&account.id, LedgerCategory::ReferralBonus)?;

    Ok(Json(ReferralStatsResponse {
        referral_code: account.referral_code,
        referral_count,
        total_earnings,
    }))
}
