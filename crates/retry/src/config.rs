//! Retry configuration value object

use conduit_core::{ConduitError, ErrorKind, Result, RetrySettings};
use std::collections::HashSet;
use std::time::Duration;

/// Error classes that are never retried, whatever the configuration says.
pub const ALWAYS_IMMEDIATE: [ErrorKind; 2] = [ErrorKind::Validation, ErrorKind::Unavailable];

/// How an operation is retried
///
/// - `max_attempts`: total invocations before giving up (>= 1)
/// - `delay`: pause between attempts
/// - `fail_immediately`: classes that stop retrying at once, on top of
///   [`ALWAYS_IMMEDIATE`]
/// - `handlers`: names of exception handlers tried, in order, once the
///   operation has definitively failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfiguration {
    max_attempts: u32,
    delay: Duration,
    fail_immediately: HashSet<ErrorKind>,
    handlers: Vec<String>,
}

impl RetryConfiguration {
    /// Create a configuration with no extra immediate classes and no handlers.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::Config` if `max_attempts` is zero.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ConduitError::config("max_attempts must be at least 1"));
        }
        Ok(Self {
            max_attempts,
            delay,
            fail_immediately: HashSet::new(),
            handlers: Vec::new(),
        })
    }

    /// A single attempt and no delay
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            fail_immediately: HashSet::new(),
            handlers: Vec::new(),
        }
    }

    /// Build from the `[retry]` section of `conduit.toml`
    pub fn from_settings(settings: &RetrySettings) -> Result<Self> {
        Self::new(settings.max_attempts, settings.delay())
    }

    /// Add a class that bypasses retry
    pub fn fail_immediately_on(mut self, kind: ErrorKind) -> Self {
        self.fail_immediately.insert(kind);
        self
    }

    /// Append a named handler to the dispatch list
    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.handlers.push(name.into());
        self
    }

    /// Total invocations allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between attempts
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Handler names in dispatch order
    pub fn handlers(&self) -> &[String] {
        &self.handlers
    }

    /// Whether a failure of this class stops retrying at once
    pub fn fails_immediately(&self, kind: ErrorKind) -> bool {
        ALWAYS_IMMEDIATE.contains(&kind) || self.fail_immediately.contains(&kind)
    }
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        let settings = RetrySettings::default();
        Self {
            max_attempts: settings.max_attempts,
            delay: settings.delay(),
            fail_immediately: HashSet::new(),
            handlers: Vec::new(),
        }
    }
}
