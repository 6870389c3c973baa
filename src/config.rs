// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and passed
//! explicitly to the components that need it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_ENV` | `production` or `development` | `production` |
//! | `TELEGRAM_BOT_TOKEN` | Bot token used to verify init data | Required for production |
//! | `SKIP_INIT_DATA_VERIFICATION` | Skip signature checks (not in production) | `false` |
//! | `INIT_DATA_MAX_AGE_SECS` | Maximum accepted `auth_date` age | unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `rewards.redb` | `./data` |
//! | `POINTS_PER_AD_VIEW` | Points credited per ad view | `10` |
//! | `REFERRAL_BONUS_REFERRER` | Bonus credited to the inviter | `5.00` |
//! | `MIN_WITHDRAWAL_POINTS` | Minimum balance required to withdraw | `1000` |
//! | `LEADERBOARD_REFRESH_SECS` | Leaderboard snapshot TTL | `60` |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS with `TLS_KEY_PATH`) | unset |
//! | `TLS_KEY_PATH` | PEM private key | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::auth::{InitDataVerifier, VerificationMode};

pub const APP_ENV_ENV: &str = "APP_ENV";
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const SKIP_VERIFICATION_ENV: &str = "SKIP_INIT_DATA_VERIFICATION";
pub const INIT_DATA_MAX_AGE_ENV: &str = "INIT_DATA_MAX_AGE_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const POINTS_PER_AD_VIEW_ENV: &str = "POINTS_PER_AD_VIEW";
pub const REFERRAL_BONUS_ENV: &str = "REFERRAL_BONUS_REFERRER";
pub const MIN_WITHDRAWAL_ENV: &str = "MIN_WITHDRAWAL_POINTS";
pub const LEADERBOARD_REFRESH_ENV: &str = "LEADERBOARD_REFRESH_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Token accepted outside production when none is configured.
///
/// Never valid in production.
pub const PLACEHOLDER_BOT_TOKEN: &str = "test_token";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TELEGRAM_BOT_TOKEN must be set to a real bot token in production")]
    MissingBotToken,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Production,
    Development,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == AppEnv::Production
    }
}

/// Reward amounts and thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSettings {
    pub points_per_ad_view: Decimal,
    pub referral_bonus: Decimal,
    pub min_withdrawal: Decimal,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            points_per_ad_view: Decimal::new(10, 0),
            referral_bonus: Decimal::new(500, 2),
            min_withdrawal: Decimal::new(1000, 0),
        }
    }
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: AppEnv,
    pub bot_token: String,
    pub skip_verification: bool,
    pub init_data_max_age: Option<Duration>,
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub rewards: RewardSettings,
    pub leaderboard_refresh: Duration,
    pub tls: Option<TlsPaths>,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let env = match get(APP_ENV_ENV).as_deref().map(str::trim) {
            None | Some("production") => AppEnv::Production,
            Some("development") | Some("dev") | Some("test") => AppEnv::Development,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: APP_ENV_ENV,
                    value: other.to_string(),
                })
            }
        };

        let bot_token = match get(BOT_TOKEN_ENV) {
            Some(token) if token != PLACEHOLDER_BOT_TOKEN => token,
            _ if env.is_production() => return Err(ConfigError::MissingBotToken),
            _ => PLACEHOLDER_BOT_TOKEN.to_string(),
        };

        let skip_flag = parse_bool(SKIP_VERIFICATION_ENV, get(SKIP_VERIFICATION_ENV))?;
        let skip_verification = skip_flag && !env.is_production();

        let init_data_max_age =
            parse_opt::<u64>(INIT_DATA_MAX_AGE_ENV, get(INIT_DATA_MAX_AGE_ENV))?
                .map(Duration::from_secs);

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_opt::<u16>(PORT_ENV, get(PORT_ENV))?.unwrap_or(DEFAULT_PORT);
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: HOST_ENV,
                value: host.clone(),
            })?;

        let data_dir =
            PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let defaults = RewardSettings::default();
        let rewards = RewardSettings {
            points_per_ad_view: parse_amount(POINTS_PER_AD_VIEW_ENV, get(POINTS_PER_AD_VIEW_ENV))?
                .unwrap_or(defaults.points_per_ad_view),
            referral_bonus: parse_amount(REFERRAL_BONUS_ENV, get(REFERRAL_BONUS_ENV))?
                .unwrap_or(defaults.referral_bonus),
            min_withdrawal: parse_amount(MIN_WITHDRAWAL_ENV, get(MIN_WITHDRAWAL_ENV))?
                .unwrap_or(defaults.min_withdrawal),
        };

        let leaderboard_secs =
            parse_opt::<u64>(LEADERBOARD_REFRESH_ENV, get(LEADERBOARD_REFRESH_ENV))?.unwrap_or(60);
        if leaderboard_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: LEADERBOARD_REFRESH_ENV,
                value: "0".to_string(),
            });
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            env,
            bot_token,
            skip_verification,
            init_data_max_age,
            bind_addr,
            data_dir,
            rewards,
            leaderboard_refresh: Duration::from_secs(leaderboard_secs),
            tls,
        })
    }

    /// Build the init-data verifier for this configuration.
    pub fn verifier(&self) -> InitDataVerifier {
        let mode = if self.skip_verification {
            VerificationMode::Bypassed
        } else {
            VerificationMode::Enforced
        };
        let verifier = InitDataVerifier::new(self.bot_token.clone(), mode);
        match self.init_data_max_age {
            Some(max_age) => verifier.with_max_age(max_age),
            None => verifier,
        }
    }
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value: raw }),
    }
}

fn parse_opt<T: FromStr>(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { name, value: raw })
        })
        .transpose()
}

fn parse_amount(name: &'static str, value: Option<String>) -> Result<Option<Decimal>, ConfigError> {
    match parse_opt::<Decimal>(name, value)? {
        Some(amount) if amount <= Decimal::ZERO => Err(ConfigError::InvalidValue {
            name,
            value: amount.to_string(),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn production_requires_bot_token() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingBotToken);
        assert_eq!(
            load(&[(BOT_TOKEN_ENV, PLACEHOLDER_BOT_TOKEN)]).unwrap_err(),
            ConfigError::MissingBotToken
        );
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[(BOT_TOKEN_ENV, "123:abc")]).unwrap();
        assert_eq!(config.env, AppEnv::Production);
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.rewards, RewardSettings::default());
        assert_eq!(config.rewards.referral_bonus.to_string(), "5.00");
        assert_eq!(config.leaderboard_refresh, Duration::from_secs(60));
        assert!(config.tls.is_none());
        assert!(config.init_data_max_age.is_none());
    }

    #[test]
    fn development_falls_back_to_placeholder_token() {
        let config = load(&[(APP_ENV_ENV, "development")]).unwrap();
        assert_eq!(config.bot_token, PLACEHOLDER_BOT_TOKEN);
        assert_eq!(config.verifier().mode(), VerificationMode::Enforced);
    }

    #[test]
    fn skip_flag_is_ignored_in_production() {
        let prod = load(&[(BOT_TOKEN_ENV, "123:abc"), (SKIP_VERIFICATION_ENV, "true")]).unwrap();
        assert!(!prod.skip_verification);
        assert_eq!(prod.verifier().mode(), VerificationMode::Enforced);

        let dev = load(&[(APP_ENV_ENV, "development"), (SKIP_VERIFICATION_ENV, "true")]).unwrap();
        assert!(dev.skip_verification);
        assert_eq!(dev.verifier().mode(), VerificationMode::Bypassed);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            (BOT_TOKEN_ENV, "123:abc"),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9000"),
            (POINTS_PER_AD_VIEW_ENV, "25"),
            (REFERRAL_BONUS_ENV, "7.5"),
            (MIN_WITHDRAWAL_ENV, "500"),
            (INIT_DATA_MAX_AGE_ENV, "86400"),
            (TLS_CERT_PATH_ENV, "/tls/cert.pem"),
            (TLS_KEY_PATH_ENV, "/tls/key.pem"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.rewards.points_per_ad_view, Decimal::new(25, 0));
        assert_eq!(config.rewards.referral_bonus, Decimal::new(75, 1));
        assert_eq!(config.rewards.min_withdrawal, Decimal::new(500, 0));
        assert_eq!(config.init_data_max_age, Some(Duration::from_secs(86400)));
        assert_eq!(config.tls.unwrap().cert, PathBuf::from("/tls/cert.pem"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let token = (BOT_TOKEN_ENV, "123:abc");
        assert!(matches!(
            load(&[token, (PORT_ENV, "eighty")]),
            Err(ConfigError::InvalidValue { name: PORT_ENV, .. })
        ));
        assert!(matches!(
            load(&[token, (REFERRAL_BONUS_ENV, "-1")]),
            Err(ConfigError::InvalidValue { name: REFERRAL_BONUS_ENV, .. })
        ));
        assert!(matches!(
            load(&[token, (APP_ENV_ENV, "staging")]),
            Err(ConfigError::InvalidValue { name: APP_ENV_ENV, .. })
        ));
        assert_eq!(
            load(&[token, (TLS_CERT_PATH_ENV, "/tls/cert.pem")]).unwrap_err(),
            ConfigError::IncompleteTls
        );
    }
}
