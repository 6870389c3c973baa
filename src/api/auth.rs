// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::extract::ApiJson;
use crate::{
    error::ApiError,
    models::Account,
    provisioning::{IdentityResolver, ProvisioningWarning},
    state::AppState,
};

/// Sign-in request sent by the Mini App on launch.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelegramSignInRequest {
    /// Raw `Telegram.WebApp.initData` query string
    pub init_data: String,
    /// Referral code from the launch link, if any
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TelegramSignInResponse {
    pub user: Account,
    /// Whether this request created the account
    pub created: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ProvisioningWarning>,
}

/// Verify Telegram init data and resolve (or create) the caller's account.
///
/// The signature is checked before anything is read or written. A
/// referral code is only honoured when the account is created by this call.
#[utoipa::path(
    post,
    path = "/v1/auth/telegram",
    request_body = TelegramSignInRequest,
    tag = "Auth",
    responses(
        (status = 200, body = TelegramSignInResponse),
        (status = 400, description = "Malformed body, missing or malformed user data"),
        (status = 401, description = "Invalid or expired init data"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn sign_in_telegram(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TelegramSignInRequest>,
) -> Result<Json<TelegramSignInResponse>, ApiError> {
    let user = state.verifier.verify(&request.init_data)?.into_user()?;

    let resolver = IdentityResolver::new(
        state.db.as_ref(),
        state.db.as_ref(),
        state.rewards.referral_bonus,
    );
    let resolution = resolver.resolve(&user, request.referral_code.as_deref())?;

    Ok(Json(TelegramSignInResponse {
        user: resolution.account,
        created: resolution.created,
        warnings: resolution.warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::init_data::sign_fields;
    use crate::models::{Account, NewAccount};
    use crate::state::test_support::{signed_init_data, test_state, TEST_BOT_TOKEN};
    use axum::http::StatusCode;
    use rust_decimal::Decimal;

    fn request(init_data: String, referral_code: Option<&str>) -> ApiJson<TelegramSignInRequest> {
        ApiJson(TelegramSignInRequest {
            init_data,
            referral_code: referral_code.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn first_sign_in_creates_account() {
        let (state, _temp_dir) = test_state();
        let init_data = signed_init_data(r#"{"id":555,"username":"ana","first_name":"Ana"}"#);

        let Json(response) =
            sign_in_telegram(State(state.clone()), request(init_data.clone(), None))
                .await
                .expect("sign-in succeeds");
        assert!(response.created);
        assert_eq!(response.user.telegram_id, Some(555));
        assert_eq!(response.user.first_name.as_deref(), Some("Ana"));
        assert!(response.warnings.is_empty());

        let Json(again) = sign_in_telegram(State(state.clone()), request(init_data, None))
            .await
            .expect("second sign-in succeeds");
        assert!(!again.created);
        assert_eq!(again.user.id, response.user.id);
    }

    #[tokio::test]
    async fn referral_code_credits_inviter() {
        let (state, _temp_dir) = test_state();
        let inviter = Account::new(
            NewAccount {
                telegram_id: Some(1),
                ..Default::default()
            },
            "ABC123",
        );
        state.db.create_account(&inviter).unwrap();

        let init_data = signed_init_data(r#"{"id":555,"username":"ana"}"#);
        let Json(response) =
            sign_in_telegram(State(state.clone()), request(init_data, Some("ABC123")))
                .await
                .unwrap();

        assert_eq!(response.user.referred_by, Some(inviter.id));
        assert_eq!(response.user.balance, Decimal::ZERO);
        let inviter = state.db.account(&inviter.id).unwrap().unwrap();
        assert_eq!(inviter.balance, state.rewards.referral_bonus);
    }

    #[tokio::test]
    async fn invalid_signature_writes_nothing() {
        let (state, _temp_dir) = test_state();
        let forged = sign_fields(&[("user", r#"{"id":555}"#)], "wrong:token");

        let err = sign_in_telegram(State(state.clone()), request(forged, None))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "invalid_signature");
        assert_eq!(state.db.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_hash_is_unauthorized() {
        let (state, _temp_dir) = test_state();
        let err = sign_in_telegram(State(state), request("user=%7B%22id%22%3A1%7D".into(), None))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "missing_hash");
    }

    #[tokio::test]
    async fn signed_payload_without_user_is_bad_request() {
        let (state, _temp_dir) = test_state();
        let init_data = sign_fields(&[("auth_date", "1700000000")], TEST_BOT_TOKEN);

        let err = sign_in_telegram(State(state.clone()), request(init_data, None))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "missing_user_data");
        assert_eq!(state.db.account_count().unwrap(), 0);
    }
}
