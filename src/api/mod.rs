// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::TelegramUser,
    error::ApiError,
    models::{Account, LeaderboardEntry, LedgerCategory, LedgerEntry},
    provisioning::ProvisioningWarning,
    state::AppState,
};

pub mod ads;
pub mod auth;
pub mod extract;
pub mod health;
pub mod leaderboard;
pub mod referral;
pub mod wallet;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/telegram", post(auth::sign_in_telegram))
        .route("/wallet/balance", get(wallet::get_balance))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wallet/add-reward", post(wallet::add_reward))
        .route("/ads/reward", post(ads::ad_reward))
        .route("/referral/stats", get(referral::referral_stats))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// Load the account of an authenticated Telegram user.
///
/// Accounts are only created by sign-in; a verified user without one gets a
/// 404.
pub(crate) fn account_for(state: &AppState, user: &TelegramUser) -> Result<Account, ApiError> {
    state
        .db
        .account_by_telegram_id(user.id)?
        .ok_or_else(ApiError::account_not_found)
}

struct TmaSecurity;

impl Modify for TmaSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "tma",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "`tma <Telegram.WebApp.initData>`",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::sign_in_telegram,
        wallet::get_balance,
        wallet::list_transactions,
        wallet::add_reward,
        ads::ad_reward,
        referral::referral_stats,
        leaderboard::get_leaderboard,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Account,
            LedgerEntry,
            LedgerCategory,
            LeaderboardEntry,
            TelegramUser,
            ProvisioningWarning,
            auth::TelegramSignInRequest,
            auth::TelegramSignInResponse,
            wallet::BalanceResponse,
            wallet::TransactionsResponse,
            wallet::AddRewardRequest,
            wallet::AddRewardResponse,
            ads::AdRewardRequest,
            ads::AdRewardResponse,
            referral::ReferralStatsResponse,
            leaderboard::LeaderboardResponse,
            leaderboard::UserRank,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&TmaSecurity),
    tags(
        (name = "Auth", description = "Telegram sign-in"),
        (name = "Wallet", description = "Points balance and ledger"),
        (name = "Ads", description = "Ad view rewards"),
        (name = "Referral", description = "Referral program"),
        (name = "Leaderboard", description = "Top earners"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
