//! Configuration Module
//!
//! Handles loading cache parameters from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::DEFAULT_CAPACITY;
use crate::error::{CacheError, Result};

const CAPACITY_VAR: &str = "LRU_CAPACITY";
const DEFAULT_TTL_VAR: &str = "LRU_DEFAULT_TTL_MS";
const CLEANUP_INTERVAL_VAR: &str = "LRU_CLEANUP_INTERVAL_MS";

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The cache never reads the environment on its own: only an explicit
/// [`Config::from_env`] or [`Config::try_from_env`] call does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of entries the cache can hold (0 selects the default)
    pub capacity: usize,
    /// Default TTL in milliseconds for new entries, 0 = never expire
    pub default_ttl_ms: u64,
    /// Background sweep interval in milliseconds, 0 = no sweeper
    pub cleanup_interval_ms: u64,
}

impl Config {
    /// Loads the configuration from environment variables, falling back to
    /// defaults for anything missing or unparsable.
    ///
    /// # Environment Variables
    /// - `LRU_CAPACITY` - Maximum cache entries (default: 10)
    /// - `LRU_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 0, never)
    /// - `LRU_CLEANUP_INTERVAL_MS` - Sweep interval in milliseconds (default: 0, disabled)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: lenient(CAPACITY_VAR, defaults.capacity),
            default_ttl_ms: lenient(DEFAULT_TTL_VAR, defaults.default_ttl_ms),
            cleanup_interval_ms: lenient(CLEANUP_INTERVAL_VAR, defaults.cleanup_interval_ms),
        }
    }

    /// Like [`Config::from_env`], but rejects values that fail to parse.
    pub fn try_from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: parse_var(CAPACITY_VAR)?.unwrap_or(defaults.capacity),
            default_ttl_ms: parse_var(DEFAULT_TTL_VAR)?.unwrap_or(defaults.default_ttl_ms),
            cleanup_interval_ms: parse_var(CLEANUP_INTERVAL_VAR)?
                .unwrap_or(defaults.cleanup_interval_ms),
        })
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_ms > 0).then(|| Duration::from_millis(self.default_ttl_ms))
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_ms > 0).then(|| Duration::from_millis(self.cleanup_interval_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl_ms: 0,
            cleanup_interval_ms: 0,
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::InvalidConfig { var, value }),
        Err(_) => Ok(None),
    }
}

fn lenient<T: FromStr + Copy + std::fmt::Debug>(var: &'static str, default: T) -> T {
    match parse_var(var) {
        Ok(value) => value.unwrap_or(default),
        Err(err) => {
            warn!("{}, using default {:?}", err, default);
            default
        }
    }
}
