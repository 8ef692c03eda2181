use chrono::Duration;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::promo::types::{MAX_CODE_LEN, MIN_CODE_LEN};
use crate::promo::{NumericCodeGenerator, PromoConfig, RedemptionPolicy};

/// Which persistence engine backs the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    JsonFile { path: PathBuf },
    Sqlite { database_url: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration read from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub promo_code_digits: u32,
    pub promo: PromoConfig,
}

impl AppConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8000;
    pub const DEFAULT_DATA_FILE: &'static str = "game_data.json";
    pub const DEFAULT_DATABASE_URL: &'static str = "sqlite://game_data.db";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "PORT", Self::DEFAULT_PORT)?;

        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("json") {
            "json" => StoreBackend::JsonFile {
                path: lookup("DATA_FILE")
                    .unwrap_or_else(|| Self::DEFAULT_DATA_FILE.to_string())
                    .into(),
            },
            "sqlite" => StoreBackend::Sqlite {
                database_url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| Self::DEFAULT_DATABASE_URL.to_string()),
            },
            other => {
                return Err(invalid("STORE_BACKEND", other, "expected 'json' or 'sqlite'"));
            }
        };

        let promo_code_digits = parse_or(
            &lookup,
            "PROMO_CODE_DIGITS",
            NumericCodeGenerator::DEFAULT_DIGITS,
        )?;
        if !(MIN_CODE_LEN as u32..=MAX_CODE_LEN as u32).contains(&promo_code_digits) {
            return Err(invalid(
                "PROMO_CODE_DIGITS",
                &promo_code_digits.to_string(),
                &format!("must be between {MIN_CODE_LEN} and {MAX_CODE_LEN}"),
            ));
        }

        let max_attempts = parse_or(
            &lookup,
            "PROMO_MAX_ATTEMPTS",
            PromoConfig::DEFAULT_MAX_ATTEMPTS,
        )?;
        if max_attempts == 0 {
            return Err(invalid("PROMO_MAX_ATTEMPTS", "0", "must be at least 1"));
        }

        let ttl = match lookup("PROMO_TTL_DAYS") {
            Some(raw) => {
                let days: i64 = parse("PROMO_TTL_DAYS", &raw)?;
                if days <= 0 {
                    return Err(invalid("PROMO_TTL_DAYS", &raw, "must be positive"));
                }
                Some(Duration::days(days))
            }
            None => None,
        };

        let redemption_policy = if parse_or(&lookup, "PROMO_REQUIRE_OWNER", false)? {
            RedemptionPolicy::OwnerOnly
        } else {
            RedemptionPolicy::AnyRequester
        };

        Ok(Self {
            host,
            port,
            store,
            promo_code_digits,
            promo: PromoConfig {
                max_attempts,
                ttl,
                redemption_policy,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, raw, &e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
