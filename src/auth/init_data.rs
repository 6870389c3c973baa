// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Telegram WebApp init-data signature verification.
//!
//! ## Algorithm
//!
//! 1. Parse the query string into key/value pairs (last value wins).
//! 2. Remove `hash`.
//! 3. Build the data-check string: `key=value` lines sorted by key, joined
//!    with `\n`.
//! 4. `secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)`
//! 5. `hash = hex(HMAC_SHA256(key = secret_key, msg = data_check_string))`
//! 6. The payload is authentic iff the computed hash equals `hash`.
//!
//! See: https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{AuthError, VerifiedInitData};

type HmacSha256 = Hmac<Sha256>;

/// Key of the first HMAC round.
pub const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Init-data field carrying the signature.
pub const HASH_FIELD: &str = "hash";

/// Length of a hex-encoded SHA-256 digest.
const HASH_HEX_LEN: usize = 64;

/// Parse an init-data query string into a sorted field map.
///
/// Keys and values are percent-decoded (`+` as space). Repeated keys keep
/// their last value; the same map feeds both the check string and the `user`
/// lookup.
pub fn parse_fields(init_data: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(init_data.as_bytes())
        .into_owned()
        .collect()
}

/// Build the data-check string from parsed fields, excluding `hash`.
///
/// `BTreeMap<String, _>` iterates in byte-wise key order.
pub fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != HASH_FIELD)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn keyed_mac(key: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidSignature)
}

fn check_string_mac(check_string: &str, bot_token: &str) -> Result<HmacSha256, AuthError> {
    let mut secret = keyed_mac(WEB_APP_DATA_KEY)?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = keyed_mac(&secret_key)?;
    mac.update(check_string.as_bytes());
    Ok(mac)
}

/// Compute the lowercase hex signature of a data-check string.
pub fn compute_hash(check_string: &str, bot_token: &str) -> Result<String, AuthError> {
    let mac = check_string_mac(check_string, bot_token)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check the `hash` field of parsed init data against the bot token.
///
/// The comparison is equivalent to exact, case-sensitive equality with the
/// lowercase hex digest, performed in constant time.
pub fn verify_signature(
    fields: &BTreeMap<String, String>,
    bot_token: &str,
) -> Result<(), AuthError> {
    let provided = fields.get(HASH_FIELD).ok_or(AuthError::MissingHash)?;

    let is_lower_hex = provided
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if provided.len() != HASH_HEX_LEN || !is_lower_hex {
        return Err(AuthError::InvalidSignature);
    }
    let provided = hex::decode(provided).map_err(|_| AuthError::InvalidSignature)?;

    check_string_mac(&data_check_string(fields), bot_token)?
        .verify_slice(&provided)
        .map_err(|_| AuthError::InvalidSignature)
}

/// Whether a raw init-data string carries a valid signature.
#[cfg(test)]
pub(crate) fn is_authentic(init_data: &str, bot_token: &str) -> bool {
    verify_signature(&parse_fields(init_data), bot_token).is_ok()
}

/// Signature checking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Every payload must carry a valid signature.
    Enforced,
    /// Signatures are not checked. Development only; never selected in
    /// production by [`crate::config::AppConfig`].
    Bypassed,
}

/// Verifies init data and extracts the Telegram identity.
#[derive(Clone)]
pub struct InitDataVerifier {
    bot_token: String,
    mode: VerificationMode,
    max_age: Option<Duration>,
}

impl std::fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("bot_token", &"<redacted>")
            .field("mode", &self.mode)
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl InitDataVerifier {
    pub fn new(bot_token: impl Into<String>, mode: VerificationMode) -> Self {
        Self {
            bot_token: bot_token.into(),
            mode,
            max_age: None,
        }
    }

    /// Reject payloads whose `auth_date` is missing or older than `max_age`.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Verify a raw init-data string.
    ///
    /// Signature problems are reported before the payload content is looked
    /// at. The returned data may still lack a user; see
    /// [`VerifiedInitData::into_user`].
    pub fn verify(&self, init_data: &str) -> Result<VerifiedInitData, AuthError> {
        let fields = parse_fields(init_data);

        match self.mode {
            VerificationMode::Enforced => verify_signature(&fields, &self.bot_token)?,
            VerificationMode::Bypassed => {
                tracing::debug!("Init-data signature check bypassed");
            }
        }

        let data = VerifiedInitData::from_fields(&fields)?;

        if let Some(max_age) = self.max_age {
            let auth_date = data.auth_date.ok_or(AuthError::InitDataExpired)?;
            let age = Utc::now().signed_duration_since(auth_date);
            if age.num_seconds() > max_age.as_secs() as i64 {
                return Err(AuthError::InitDataExpired);
            }
        }

        Ok(data)
    }
}

/// Sign a set of fields the way Telegram does. Test helper.
#[cfg(test)]
pub(crate) fn sign_fields(pairs: &[(&str, &str)], bot_token: &str) -> String {
    let fields: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = compute_hash(&data_check_string(&fields), bot_token).unwrap();

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(HASH_FIELD, &hash);
    serializer.finish()
}
