//! Fault monitor configuration.
//!
//! # Example
//! ```rust,ignore
//! use ouroboros_future::{FaultMonitor, FaultMonitorConfig};
//!
//! // From environment
//! let config = FaultMonitorConfig::from_env()?;
//!
//! // Or explicit configuration
//! let config = FaultMonitorConfig { max_history: 16, ..Default::default() };
//!
//! let monitor = FaultMonitor::with_config(config);
//! ```

use crate::error::FutureError;

/// Environment variable holding the fault history capacity
pub const ENV_FAULT_HISTORY: &str = "OUROBOROS_FUTURE_FAULT_HISTORY";

/// Environment variable toggling fault logging
pub const ENV_LOG_FAULTS: &str = "OUROBOROS_FUTURE_LOG_FAULTS";

/// Settings for a [`FaultMonitor`](crate::FaultMonitor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultMonitorConfig {
    /// Maximum number of faults kept in history
    pub max_history: usize,
    /// Whether faults are logged when no custom handler is installed
    pub log_faults: bool,
}

impl Default for FaultMonitorConfig {
    fn default() -> Self {
        Self {
            max_history: 100,
            log_faults: true,
        }
    }
}

impl FaultMonitorConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `OUROBOROS_FUTURE_FAULT_HISTORY` (a count) and
    /// `OUROBOROS_FUTURE_LOG_FAULTS` (`true`/`false`/`1`/`0`/`yes`/`no`).
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, FutureError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FutureError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_FAULT_HISTORY) {
            config.max_history = raw.trim().parse().map_err(|_| {
                FutureError::Configuration(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_FAULT_HISTORY, raw
                ))
            })?;
        }

        if let Some(raw) = lookup(ENV_LOG_FAULTS) {
            config.log_faults = parse_flag(&raw).ok_or_else(|| {
                FutureError::Configuration(format!(
                    "{} must be a boolean, got '{}'",
                    ENV_LOG_FAULTS, raw
                ))
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
