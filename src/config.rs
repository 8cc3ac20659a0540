//! Relay server settings, read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const LISTEN_ADDR_VAR: &str = "RELAY_LISTEN_ADDR";
pub const DATABASE_URL_VAR: &str = "RELAY_DATABASE_URL";
pub const POLL_INTERVAL_VAR: &str = "RELAY_POLL_INTERVAL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a socket address: {value}")]
    Addr { var: &'static str, value: String },

    #[error("{var} is not a number of milliseconds: {value}")]
    Interval { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Defaults to an in-memory log that lives as long as the process.
    pub database_url: String,
    /// Upper bound on how long a subscriber waits before re-reading the log.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 50051)),
            database_url: "sqlite::memory:".to_string(),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` yields.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(LISTEN_ADDR_VAR) {
            config.listen_addr = value.parse().map_err(|_| ConfigError::Addr {
                var: LISTEN_ADDR_VAR,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(DATABASE_URL_VAR) {
            config.database_url = value;
        }

        if let Some(value) = lookup(POLL_INTERVAL_VAR) {
            let millis: u64 = value.parse().map_err(|_| ConfigError::Interval {
                var: POLL_INTERVAL_VAR,
                value: value.clone(),
            })?;
            config.poll_interval = Duration::from_millis(millis);
        }

        Ok(config)
    }
}
