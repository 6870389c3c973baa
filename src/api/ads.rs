// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::{account_for, extract::ApiJson};
use crate::{
    auth::TelegramAuth,
    error::ApiError,
    models::{CreditRequest, LedgerCategory},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdRewardRequest {
    /// Ad format reported by the ad network (e.g. `interstitial`)
    pub ad_type: String,
    /// Revenue reported for the impression
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub revenue: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdRewardResponse {
    pub success: bool,
    /// Points credited
    pub reward: Decimal,
}

/// Credit the caller for a completed ad view.
#[utoipa::path(
    post,
    path = "/v1/ads/reward",
    request_body = AdRewardRequest,
    tag = "Ads",
    security(("tma" = [])),
    responses(
        (status = 200, body = AdRewardResponse),
        (status = 400, description = "Missing ad type"),
        (status = 401, description = "Invalid init data"),
        (status = 404, description = "No account for this Telegram user")
    )
)]
pub async fn ad_reward(
    TelegramAuth(user): TelegramAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AdRewardRequest>,
) -> Result<Json<AdRewardResponse>, ApiError> {
    let ad_type = request.ad_type.trim();
    if ad_type.is_empty() {
        return Err(ApiError::bad_request("adType is required"));
    }

    let account = account_for(&state, &user)?;
    let reward = state.rewards.points_per_ad_view;
    let revenue = request.revenue.unwrap_or(Decimal::ZERO);

    let credit = CreditRequest::new(account.id, reward, LedgerCategory::AdReward)
        .with_description(format!("Watched {ad_type} ad"))
        .with_metadata(json!({ "ad_type": ad_type, "revenue": revenue }));
    state.db.apply_credit(&credit)?;

    Ok(Json(AdRewardResponse {
        success: true,
        reward,
    }))
}
