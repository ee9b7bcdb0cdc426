//! StoreConfig - connection settings read from the process environment.

use std::time::Duration;

use crate::error::ConnectError;

/// Environment variable holding the connection URI.
pub const URI_VAR: &str = "MONGODB_URI";

/// Environment variable overriding the liveness probe bound, in seconds.
pub const PING_TIMEOUT_VAR: &str = "PUCCI_PING_TIMEOUT_SECS";

/// Default bound on client creation plus the initial liveness probe.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a [`StoreAdapter`](crate::StoreAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub uri: String,
    pub ping_timeout: Duration,
}

impl StoreConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    pub fn with_ping_timeout(mut self, ping_timeout: Duration) -> Self {
        self.ping_timeout = ping_timeout;
        self
    }

    /// Load from the process environment, reading a `.env` file first if one
    /// is present.
    pub fn from_env() -> Result<Self, ConnectError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(ConnectError::InvalidConfig(err.to_string()));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConnectError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup(URI_VAR)
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(ConnectError::MissingUri)?;

        let ping_timeout = match lookup(PING_TIMEOUT_VAR) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_PING_TIMEOUT,
        };

        Ok(Self { uri, ping_timeout })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConnectError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConnectError::InvalidConfig(format!(
            "{} must be a positive number of seconds, got {:?}",
            PING_TIMEOUT_VAR, raw
        ))),
    }
}
