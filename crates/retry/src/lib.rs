//! Bounded retry for Conduit
//!
//! - [`RetryConfiguration`]: attempts, delay, fail-immediately classes and
//!   handler names
//! - [`HandlerRegistry`]: named exception handlers matched by error class
//! - [`RetryExecutor`]: runs an operation under a configuration, with a
//!   process-wide on/off switch

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod executor;
pub mod handler;

pub use config::{RetryConfiguration, ALWAYS_IMMEDIATE};
pub use executor::{
    retry_enabled, set_retry_enabled, RetryExecutor, RetrySwitch, Sleeper, ThreadSleeper,
};
pub use handler::{ExceptionHandler, HandlerRegistry};
