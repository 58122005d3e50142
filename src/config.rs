use std::time::Duration;

use crate::error::{AppError, Result};

pub const API_URL: &str = "http://localhost:3000";

/// Poll interval default (seconds). The service's upstream price source is rate
/// limited, so this stays in the tens of seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Countdown decrement period (seconds).
pub const COUNTDOWN_TICK_SECS: u64 = 1;

/// Key of the single durable slot holding the player identity.
pub const PLAYER_ID_KEY: &str = "crypto-guru-player-id";

pub const DEFAULT_STORE_PATH: &str = "guesser-player.json";
pub const DEFAULT_LOG_FILE: &str = "guesser.log";

/// User-facing messages written to the error slot.
pub mod messages {
    pub const PRICE_FAILED: &str = "Failed to load BTC price";
    pub const STATUS_FAILED: &str = "Failed to load player status";
    pub const CREATE_FAILED: &str = "Failed to create player. Please try again.";
    pub const GUESS_FAILED: &str = "Failed to submit guess";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub poll_interval: Duration,
    /// Path of the JSON file backing the durable identity slot (PLAYER_STORE_PATH)
    pub store_path: String,
    /// Optional per-request timeout (HTTP_TIMEOUT_SECS). Unset means no timeout.
    pub http_timeout: Option<Duration>,
    pub log_level: String,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            store_path: DEFAULT_STORE_PATH.to_string(),
            http_timeout: None,
            log_level: "info".to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("GUESSER_API_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        if api_url.is_empty() {
            return Err(AppError::Config("GUESSER_API_URL must not be empty".to_string()));
        }

        let poll_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                AppError::Config("POLL_INTERVAL_SECS must be a whole number of seconds".to_string())
            })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        if poll_secs == 0 {
            return Err(AppError::Config("POLL_INTERVAL_SECS must be greater than zero".to_string()));
        }

        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            Some(v) => Some(Duration::from_secs(v.trim().parse::<u64>().map_err(|_| {
                AppError::Config("HTTP_TIMEOUT_SECS must be a whole number of seconds".to_string())
            })?)),
            None => None,
        };

        Ok(Self {
            api_url,
            poll_interval: Duration::from_secs(poll_secs),
            store_path: lookup("PLAYER_STORE_PATH").unwrap_or(defaults.store_path),
            http_timeout,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: lookup("LOG_FILE").unwrap_or(defaults.log_file),
        })
    }
}
