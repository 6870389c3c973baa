// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Telegram identity carried in WebApp init data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Init-data field holding the JSON-encoded Telegram user.
pub const USER_FIELD: &str = "user";

/// Telegram user object embedded in the init data `user` field.
///
/// See: https://core.telegram.org/bots/webapps#webappuser
///
/// Only the fields the server uses are declared; anything else Telegram
/// sends is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TelegramUser {
    /// Telegram user id
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Profile photo URL
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Init data after the signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInitData {
    pub user: Option<TelegramUser>,
    /// When Telegram signed the payload
    pub auth_date: Option<DateTime<Utc>>,
}

impl VerifiedInitData {
    /// Extract the typed fields from parsed init data.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, AuthError> {
        let user = fields
            .get(USER_FIELD)
            .map(|raw| serde_json::from_str::<TelegramUser>(raw))
            .transpose()
            .map_err(|_| AuthError::MalformedUserData)?;

        let auth_date = fields
            .get("auth_date")
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Ok(Self { user, auth_date })
    }

    /// The embedded Telegram user, or [`AuthError::MissingUserData`].
    pub fn into_user(self) -> Result<TelegramUser, AuthError> {
        self.user.ok_or(AuthError::MissingUserData)
    }
}
