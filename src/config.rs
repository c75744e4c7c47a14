use std::time::Duration;
use thiserror::Error;

use crate::supervisor::{TimeoutPolicy, DEFAULT_SWEEP_INTERVAL, DEFAULT_TURN_TIMEOUT};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

const BIND_ADDR_KEY: &str = "CHESS_BIND_ADDR";
const TURN_TIMEOUT_KEY: &str = "CHESS_TURN_TIMEOUT_SECS";
const SWEEP_INTERVAL_KEY: &str = "CHESS_SWEEP_INTERVAL_SECS";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub turn_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Read the process environment, after loading `.env` if one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        let bind_addr = lookup(BIND_ADDR_KEY)
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .unwrap_or(defaults.bind_addr);
        let turn_timeout = seconds(&lookup, TURN_TIMEOUT_KEY)?.unwrap_or(defaults.turn_timeout);
        let sweep_interval =
            seconds(&lookup, SWEEP_INTERVAL_KEY)?.unwrap_or(defaults.sweep_interval);

        // interval() panics on a zero period
        if sweep_interval.is_zero() {
            return Err(ConfigError::Zero(SWEEP_INTERVAL_KEY));
        }

        Ok(ServerConfig {
            bind_addr,
            turn_timeout,
            sweep_interval,
        })
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            turn_timeout: self.turn_timeout,
            sweep_interval: self.sweep_interval,
        }
    }
}

fn seconds<F>(lookup: &F, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
