// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for Telegram-authenticated requests.
//!
//! Use the `TelegramAuth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(TelegramAuth(user): TelegramAuth) -> impl IntoResponse {
//!     // user is the verified TelegramUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, TelegramUser};
use crate::state::AppState;

/// Authorization scheme carrying raw init data.
pub const TMA_SCHEME: &str = "tma";

/// Extractor for Telegram-authenticated users.
///
/// Reads `Authorization: tma <initData>`, verifies the signature with the
/// verifier in [`AppState`] and yields the embedded user. The identity is
/// only ever taken from the signed payload.
pub struct TelegramAuth(pub TelegramUser);

impl FromRequestParts<AppState> for TelegramAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let init_data = parse_tma_header(auth_header)?;
        let user = state.verifier.verify(init_data)?.into_user()?;

        Ok(TelegramAuth(user))
    }
}

fn parse_tma_header(value: &str) -> Result<&str, AuthError> {
    let (scheme, init_data) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case(TMA_SCHEME) {
        return Err(AuthError::InvalidAuthHeader);
    }
    let init_data = init_data.trim();
    if init_data.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(init_data)
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalTelegramAuth(pub Option<TelegramUser>);

impl FromRequestParts<AppState> for OptionalTelegramAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match TelegramAuth::from_request_parts(parts, state).await {
            Ok(TelegramAuth(user)) => Ok(OptionalTelegramAuth(Some(user))),
            Err(_) => Ok(OptionalTelegramAuth(None)),
        }
    }
}
