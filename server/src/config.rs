//! Mirror settings, read from the process environment.
//!
//! | Variable                   | Meaning                                   | Default   |
//! |----------------------------|-------------------------------------------|-----------|
//! | `DATABASE_URL`             | PostgreSQL connection URL                 | required  |
//! | `HOST`                     | IP address to listen on                   | `0.0.0.0` |
//! | `PORT`                     | TCP port to listen on                     | `3000`    |
//! | `DATABASE_MAX_CONNECTIONS` | Upper bound of the connection pool        | `10`      |
//! | `AUTH_SECRET`              | Key clients must send in `x-mirror-key`   | unset     |
//!
//! Blank values count as unset.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    /// `None` disables the mirror key check
    pub auth_secret: Option<String>,
}

impl Config {
    /// Defaults for everything but the database.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auth_secret: None,
        }
    }

    pub fn with_auth_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth_secret = Some(secret.into());
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut config = Self::new(database_url);

        if let Some(raw) = var("HOST") {
            let ip = raw.parse().map_err(|_| ConfigError::invalid("HOST", &raw))?;
            config.listen.set_ip(ip);
        }
        if let Some(raw) = var("PORT") {
            let port = raw.parse().map_err(|_| ConfigError::invalid("PORT", &raw))?;
            config.listen.set_port(port);
        }
        if let Some(raw) = var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", &raw)),
            };
        }
        config.auth_secret = var("AUTH_SECRET");

        Ok(config)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an unusable value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
        }
    }
}
