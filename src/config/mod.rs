//! Configuration module - environment variable parsing

use std::env;

/// Core configuration loaded from environment variables by the hosting
/// service. The core itself never arms timers; the host is expected to
/// call `MatchController::expire_response` after `response_timeout_secs`
/// of silence from the player whose response is pending.
#[derive(Clone, Debug)]
pub struct Config {
    /// Seconds a player may take to answer a card step before the host
    /// applies the deterministic "no valid defense" default
    pub response_timeout_secs: u64,
    /// Capacity used for matches created without an explicit one (2-4)
    pub default_capacity: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let response_timeout_secs = match env::var("RESPONSE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("RESPONSE_TIMEOUT_SECS"))?,
            Err(_) => 30,
        };

        let default_capacity = match env::var("DEFAULT_MATCH_CAPACITY") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("DEFAULT_MATCH_CAPACITY"))?,
            Err(_) => 4,
        };

        if !(2..=4).contains(&default_capacity) {
            return Err(ConfigError::InvalidCapacity(default_capacity));
        }

        Ok(Self {
            response_timeout_secs,
            default_capacity,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            response_timeout_secs: 30,
            default_capacity: 4,
            log_level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not a valid number")]
    InvalidNumber(&'static str),

    #[error("Match capacity {0} is outside the supported 2-4 range")]
    InvalidCapacity(usize),
}
