//! Bounded retry executor
//!
//! ## Attempt loop
//!
//! ```text
//! 1. Invoke the operation
//! 2. Ok → return it
//! 3. Err → attempts += 1
//!    - retry switch off, class fails immediately, or attempts == max → stop
//!    - otherwise sleep the configured delay and go to 1
//! 4. Stopped with Err → first configured handler accepting the class runs
//!    and its result is returned; no handler → the error is returned
//! ```
//!
//! Delays come from a `backon` constant backoff capped at `max_attempts - 1`
//! pauses.

use crate::config::RetryConfiguration;
use crate::handler::HandlerRegistry;
use backon::{BackoffBuilder, ConstantBuilder};
use conduit_core::Classify;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

static RETRY_ENABLED: AtomicBool = AtomicBool::new(true);

/// On/off switch for retrying
///
/// [`RetrySwitch::global`] is the process-wide switch every default
/// executor consults. [`RetrySwitch::detached`] creates an independent switch
/// for executors that must not observe the global one.
#[derive(Clone)]
pub enum RetrySwitch {
    /// The process-wide switch
    Global,
    /// An independent switch
    Detached(Arc<AtomicBool>),
}

impl RetrySwitch {
    /// The process-wide switch
    pub fn global() -> Self {
        RetrySwitch::Global
    }

    /// An independent switch with the given initial state
    pub fn detached(enabled: bool) -> Self {
        RetrySwitch::Detached(Arc::new(AtomicBool::new(enabled)))
    }

    fn flag(&self) -> &AtomicBool {
        match self {
            RetrySwitch::Global => &RETRY_ENABLED,
            RetrySwitch::Detached(flag) => flag,
        }
    }

    /// Whether retrying is enabled
    pub fn is_enabled(&self) -> bool {
        self.flag().load(Ordering::SeqCst)
    }

    /// Enable or disable retrying
    pub fn set(&self, enabled: bool) {
        self.flag().store(enabled, Ordering::SeqCst);
    }
}

impl Default for RetrySwitch {
    fn default() -> Self {
        RetrySwitch::Global
    }
}

/// Enable or disable retrying for every executor using the global switch
pub fn set_retry_enabled(enabled: bool) {
    RetrySwitch::global().set(enabled);
}

/// Whether the global switch allows retrying
pub fn retry_enabled() -> bool {
    RetrySwitch::global().is_enabled()
}

/// Blocks the calling thread between attempts
pub trait Sleeper: Send + Sync {
    /// Pause for `duration`
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Runs operations under a [`RetryConfiguration`]
#[derive(Clone)]
pub struct RetryExecutor {
    switch: RetrySwitch,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryExecutor {
    /// Executor using the global switch and real sleeps
    pub fn new() -> Self {
        Self {
            switch: RetrySwitch::global(),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Use a different switch
    pub fn with_switch(mut self, switch: RetrySwitch) -> Self {
        self.switch = switch;
        self
    }

    /// Use a different sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The switch this executor consults
    pub fn switch(&self) -> &RetrySwitch {
        &self.switch
    }

    /// Run `op` with `args`, retrying per `config`, then dispatching to
    /// `handlers` if it still fails.
    pub fn execute<A, T, E, F>(
        &self,
        config: &RetryConfiguration,
        handlers: &HandlerRegistry<A, T, E>,
        args: &A,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut(&A) -> Result<T, E>,
        E: Classify + Display,
    {
        let mut delays = ConstantBuilder::default()
            .with_delay(config.delay())
            .with_max_times(config.max_attempts().saturating_sub(1) as usize)
            .build();
        let mut attempts: u32 = 0;

        let error = loop {
            attempts += 1;
            let error = match op(args) {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(
                            target: "conduit::retry",
                            attempts,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let kind = error.kind();
            if !self.switch.is_enabled() {
                debug!(target: "conduit::retry", %kind, "Retry disabled, failing immediately");
                break error;
            }
            if config.fails_immediately(kind) {
                debug!(target: "conduit::retry", %kind, "Fail-immediately class, not retrying");
                break error;
            }
            if attempts >= config.max_attempts() {
                break error;
            }
            match delays.next() {
                Some(delay) => {
                    debug!(
                        target: "conduit::retry",
                        attempt = attempts,
                        max_attempts = config.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    self.sleeper.sleep(delay);
                }
                None => break error,
            }
        };

        let kind = error.kind();
        match handlers.select(config.handlers(), kind) {
            Some(handler) => {
                debug!(
                    target: "conduit::retry",
                    handler = handler.name(),
                    %kind,
                    attempts,
                    "Dispatching failure to exception handler"
                );
                handler.invoke(&error, args)
            }
            None => {
                warn!(
                    target: "conduit::retry",
                    %kind,
                    attempts,
                    error = %error,
                    "Operation failed"
                );
                Err(error)
            }
        }
    }

    /// Run a no-argument operation with no handlers
    pub fn run<T, E, F>(&self, config: &RetryConfiguration, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Classify + Display,
    {
        self.execute(config, &HandlerRegistry::new(), &(), |_| op())
    }

    /// Wrap `op` so every call goes through this executor
    pub fn wrap<A, T, E, F>(
        &self,
        config: RetryConfiguration,
        handlers: Arc<HandlerRegistry<A, T, E>>,
        mut op: F,
    ) -> impl FnMut(&A) -> Result<T, E>
    where
        F: FnMut(&A) -> Result<T, E>,
        E: Classify + Display,
    {
        let executor = self.clone();
        move |args: &A| executor.execute(&config, &handlers, args, &mut op)
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}
