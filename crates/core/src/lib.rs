//! Core types for Conduit
//!
//! This crate defines the foundational types used throughout the workspace:
//! - Identifiers: TransactionId, CellId, InstanceId
//! - OperationContext: the transaction and continuation of one operation
//! - ResourceKind: the four transactional resource slots and their ordering
//! - Errors: ResourceError, ConduitError, and the ErrorKind class tag
//! - Config: ConduitConfig loaded from `conduit.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use config::{
    ConduitConfig, RendezvousSettings, RetrySettings, CONFIG_FILE_NAME, MAX_RENDEZVOUS_TIMEOUT_SECS,
};
pub use context::{OperationContext, Transaction, TransactionStatus};
pub use error::{Classify, ConduitError, ErrorKind, ResourceError, ResourceResult, Result};
pub use types::{CellId, InstanceId, ResourceKind, TransactionId};
