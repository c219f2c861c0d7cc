//! Connection configuration via TOML
//!
//! A connection reads its transaction defaults from a small TOML document.
//! Every field is optional; missing fields take the defaults below.

use ovsdb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default transaction timeout in milliseconds (three minutes)
pub const DEFAULT_TIMEOUT_MS: u64 = 180_000;

/// Default idle wait of the connection worker in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Connection configuration
///
/// # Example
///
/// ```toml
/// timeout_ms = 180000
/// poll_interval_ms = 100
/// check_error = false
/// log_errors = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Timeout inherited by transactions that do not set their own
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// How long the worker waits for work between event-loop runs
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Surface transaction failures as errors instead of `None`
    #[serde(default)]
    pub check_error: bool,
    /// Log transaction failures
    #[serde(default = "default_log_errors")]
    pub log_errors: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_log_errors() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            check_error: false,
            log_errors: true,
        }
    }
}

impl ConnectionConfig {
    /// Transaction timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Worker idle wait
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeout_ms must be greater than 0".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ConnectionConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse connection config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# OVSDB connection configuration
#
# Transaction timeout in milliseconds (default: 180000).
# A transaction that has not finished by then is reported as timed out.
timeout_ms = 180000

# Idle wait of the connection worker between event-loop runs (default: 100).
poll_interval_ms = 100

# Return transaction failures as errors instead of an empty result (default: false)
check_error = false

# Log transaction failures (default: true)
log_errors = true
"#
    }
}

/// Per-transaction overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Timeout; `None` inherits the connection's
    pub timeout: Option<Duration>,
    /// Surface failures as errors
    pub check_error: bool,
    /// Log failures
    pub log_errors: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            check_error: false,
            log_errors: true,
        }
    }
}

impl From<&ConnectionConfig> for TransactionOptions {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            timeout: None,
            check_error: config.check_error,
            log_errors: config.log_errors,
        }
    }
}

impl TransactionOptions {
    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set strict mode
    pub fn with_check_error(mut self, check_error: bool) -> Self {
        self.check_error = check_error;
        self
    }

    /// Set failure logging
    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }
}
