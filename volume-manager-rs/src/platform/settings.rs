//! Runtime settings for the monitor.
//!
//! Defaults can be overridden from environment variables (daemon) or from a
//! JSON object (FFI `create`).

use crate::engine::activity::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const ENV_POLL_SECS: &str = "VOLUME_MANAGER_POLL_SECS";
pub const ENV_LOG_CAPACITY: &str = "VOLUME_MANAGER_LOG_CAPACITY";
pub const ENV_QUERY_TIMEOUT_MS: &str = "VOLUME_MANAGER_QUERY_TIMEOUT_MS";
pub const ENV_PREFERENCES: &str = "VOLUME_MANAGER_PREFERENCES";
pub const ENV_LOG: &str = "VOLUME_MANAGER_LOG";

/// Monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fallback poll interval in seconds
    pub poll_interval_secs: u64,

    /// Maximum activity log entries
    pub log_capacity: usize,

    /// Hard deadline for a single OS audio query, in milliseconds
    pub query_timeout_ms: u64,

    /// Preferences file override; the per-user config directory otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            log_capacity: DEFAULT_CAPACITY,
            query_timeout_ms: 3000,
            preferences_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden by `VOLUME_MANAGER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(secs) = parse_var(&lookup, ENV_POLL_SECS) {
            settings.poll_interval_secs = secs;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_LOG_CAPACITY) {
            settings.log_capacity = capacity;
        }
        if let Some(ms) = parse_var(&lookup, ENV_QUERY_TIMEOUT_MS) {
            settings.query_timeout_ms = ms;
        }
        if let Some(path) = lookup(ENV_PREFERENCES).filter(|p| !p.trim().is_empty()) {
            settings.preferences_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup(ENV_LOG).filter(|l| !l.trim().is_empty()) {
            settings.log_level = level;
        }

        settings
    }

    /// Poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Query timeout, never shorter than 100ms.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(100))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
