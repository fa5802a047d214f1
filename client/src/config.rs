//! Configuration management for the client runtime.

use std::env;
use std::time::Duration;

/// Default local database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://lumen.db?mode=rwc";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// SQLite connection URL for the on-device store
    pub database_url: String,
    /// Base URL of the remote mirror; `None` keeps the client local-only
    pub mirror_url: Option<String>,
    /// Shared key sent to the mirror, if it requires one
    pub mirror_key: Option<String>,
    /// Upper bound on every single remote call
    pub remote_timeout: Duration,
    /// Remote calls in flight at once during a sync pass
    pub max_in_flight: usize,
    /// Device locale, used for first-run account defaults
    pub locale: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            mirror_url: None,
            mirror_key: None,
            remote_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            locale: "en-US".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = non_empty("LUMEN_DATABASE_URL").unwrap_or(defaults.database_url);
        let mirror_url = non_empty("LUMEN_MIRROR_URL").map(|u| u.trim_end_matches('/').to_string());
        let mirror_key = non_empty("LUMEN_MIRROR_KEY");

        let remote_timeout = match non_empty("LUMEN_REMOTE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                    name: "LUMEN_REMOTE_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
            }
            None => defaults.remote_timeout,
        };

        let max_in_flight = match non_empty("LUMEN_MAX_IN_FLIGHT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "LUMEN_MAX_IN_FLIGHT",
                        value: raw,
                    })
                }
            },
            None => defaults.max_in_flight,
        };

        let locale = non_empty("LUMEN_LOCALE").unwrap_or(defaults.locale);

        Ok(Self {
            database_url,
            mirror_url,
            mirror_key,
            remote_timeout,
            max_in_flight,
            locale,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}
