// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::provisioning::ProvisioningError;
use crate::storage::StorageError;

/// Message returned for every 5xx; the detail goes to the log only.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", message)
    }

    /// Log `detail` and return a generic 500.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            INTERNAL_ERROR_MESSAGE,
        )
    }

    /// 404 for an authenticated Telegram user without an account.
    pub fn account_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "account_not_found", "User not found")
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(e.status_code(), e.error_code(), e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InsufficientBalance { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                "Insufficient balance",
            ),
            StorageError::InvalidAmount(msg) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_amount", msg)
            }
            other => Self::internal(other),
        }
    }
}

impl From<ProvisioningError> for ApiError {
    fn from(e: ProvisioningError) -> Self {
        Self::internal(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::account_not_found();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "User not found");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.code, "bad_request");

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unp.message, "oops");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","error_code":"bad_request"}"#);
    }

    #[test]
    fn storage_failures_hide_detail() {
        let err: ApiError = StorageError::NotFound("accounts table /secret/path".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "internal_error");
        assert_eq!(err.message, INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn insufficient_balance_is_unprocessable() {
        let err: ApiError = StorageError::InsufficientBalance {
            account_id: Uuid::new_v4(),
            balance: Decimal::ZERO,
            amount: Decimal::new(-5, 0),
        }
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "insufficient_balance");
    }

    #[test]
    fn auth_errors_keep_their_code() {
        let err: ApiError = AuthError::InvalidSignature.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "invalid_signature");
    }

    #[tokio::test]
    async fn provisioning_failures_are_generic_500s() {
        let storage = ProvisioningError::Storage(StorageError::Io(std::io::Error::other(
            "write failed: /var/lib/rewards/rewards.redb",
        )));
        for err in [storage, ProvisioningError::ReferralCodeExhausted(5)] {
            let err: ApiError = err.into();
            assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.code, "internal_error");
            assert_eq!(err.message, INTERNAL_ERROR_MESSAGE);

            let response = err.into_response();
            let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = String::from_utf8(body_bytes.to_vec()).unwrap();
            assert_eq!(
                body,
                r#"{"error":"Internal server error","error_code":"internal_error"}"#
            );
            assert!(!body.contains("rewards.redb"));
        }
    }
}
