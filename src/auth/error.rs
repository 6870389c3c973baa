// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Signature and header problems are reported as 401 before any identity or
/// persistence logic runs. A correctly signed payload without a usable
/// `user` field is a 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Authorization header is not `tma <initData>`
    InvalidAuthHeader,
    /// Init data has no `hash` field
    MissingHash,
    /// Computed hash does not match the `hash` field
    InvalidSignature,
    /// `auth_date` missing or older than the configured maximum age
    InitDataExpired,
    /// Init data carries no `user` field
    MissingUserData,
    /// `user` field is not a valid Telegram user object
    MalformedUserData,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MissingHash => "missing_hash",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InitDataExpired => "init_data_expired",
            AuthError::MissingUserData => "missing_user_data",
            AuthError::MalformedUserData => "malformed_user_data",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MissingHash
            | AuthError::InvalidSignature
            | AuthError::InitDataExpired => StatusCode::UNAUTHORIZED,
            AuthError::MissingUserData | AuthError::MalformedUserData => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'tma <initData>')")
            }
            AuthError::MissingHash => write!(f, "Invalid Telegram data: hash is missing"),
            AuthError::InvalidSignature => write!(f, "Invalid Telegram data"),
            AuthError::InitDataExpired => write!(f, "Telegram data has expired"),
            AuthError::MissingUserData => write!(f, "No user data provided"),
            AuthError::MalformedUserData => write!(f, "User data is malformed"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
