//! Runtime configuration via `conduit.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use crate::error::{ConduitError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "conduit.toml";

/// Upper bound accepted for either rendezvous timeout (one week).
pub const MAX_RENDEZVOUS_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Retry executor defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Process-wide retry switch. When false every failure is immediate.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Attempts made before giving up (>= 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    100
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Delay between attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Rendezvous poll timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RendezvousSettings {
    /// How long an in-process continuation poll waits, in seconds.
    #[serde(default = "default_continuation_timeout_secs")]
    pub continuation_timeout_secs: u64,
    /// How long a cross-process pending-result poll waits, in seconds.
    #[serde(default = "default_pending_result_timeout_secs")]
    pub pending_result_timeout_secs: u64,
}

fn default_continuation_timeout_secs() -> u64 {
    120
}

fn default_pending_result_timeout_secs() -> u64 {
    30
}

impl Default for RendezvousSettings {
    fn default() -> Self {
        Self {
            continuation_timeout_secs: default_continuation_timeout_secs(),
            pending_result_timeout_secs: default_pending_result_timeout_secs(),
        }
    }
}

impl RendezvousSettings {
    /// Continuation poll timeout.
    pub fn continuation_timeout(&self) -> Duration {
        Duration::from_secs(self.continuation_timeout_secs)
    }

    /// Pending-result poll timeout.
    pub fn pending_result_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_result_timeout_secs)
    }
}

fn check_timeout(field: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(ConduitError::config(format!("{} must be positive", field)));
    }
    if secs > MAX_RENDEZVOUS_TIMEOUT_SECS {
        return Err(ConduitError::config(format!(
            "{} must be at most {} (got {})",
            field, MAX_RENDEZVOUS_TIMEOUT_SECS, secs
        )));
    }
    Ok(())
}

/// Configuration loaded from `conduit.toml`.
///
/// # Example
///
/// ```toml
/// log_filter = "info,conduit::txn=debug"
///
/// [retry]
/// enabled = true
/// max_attempts = 3
/// delay_ms = 100
///
/// [rendezvous]
/// continuation_timeout_secs = 120
/// pending_result_timeout_secs = 30
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConduitConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Retry executor defaults.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Rendezvous timeouts.
    #[serde(default)]
    pub rendezvous: RendezvousSettings,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ConduitConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            retry: RetrySettings::default(),
            rendezvous: RendezvousSettings::default(),
        }
    }
}

impl ConduitConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::Config` if `max_attempts` is zero, or if a
    /// timeout is zero or above [`MAX_RENDEZVOUS_TIMEOUT_SECS`].
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ConduitError::config("retry.max_attempts must be at least 1"));
        }
        check_timeout(
            "rendezvous.continuation_timeout_secs",
            self.rendezvous.continuation_timeout_secs,
        )?;
        check_timeout(
            "rendezvous.pending_result_timeout_secs",
            self.rendezvous.pending_result_timeout_secs,
        )
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ConduitConfig = toml::from_str(content)
            .map_err(|e| ConduitError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConduitError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                ConduitError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Conduit runtime configuration

# tracing filter used when RUST_LOG is not set
log_filter = "info"

[retry]
# Set to false to make every failure immediate (deterministic tests)
enabled = true
max_attempts = 3
delay_ms = 100

[rendezvous]
# In-process continuations
continuation_timeout_secs = 120
# Cross-process pending results
pending_result_timeout_secs = 30
"#
    }
}
