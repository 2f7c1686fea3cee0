//! Error types for Conduit
//!
//! Two layers:
//! - [`ResourceError`]: failures reported by an underlying resource client
//!   (item store, blob store, queue, publisher, broadcast channel)
//! - [`ConduitError`]: everything the coordinator, registries and retry
//!   executor surface to calling code
//!
//! Both expose an [`ErrorKind`] class tag through [`Classify`]. Retry
//! fail-immediately sets and exception-handler registries match on that tag
//! rather than on concrete error values.

use crate::types::{CellId, ResourceKind, TransactionId};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Conduit operations
pub type Result<T> = std::result::Result<T, ConduitError>;

/// Result type alias for resource client operations
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;

/// Runtime class of an error
///
/// `Custom` lets callers introduce their own domain classes without
/// extending this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested entity does not exist
    NotFound,
    /// Uniqueness or optimistic-version constraint violated
    Conflict,
    /// Input rejected by validation
    Validation,
    /// Resource could not be reached
    Unavailable,
    /// Rendezvous timed out
    Timeout,
    /// `begin` while a transaction is already active
    NestedTransaction,
    /// commit, abort or mutation without an active transaction
    NonExistentTransaction,
    /// A resource failed while committing
    TransactionalResource,
    /// Rendezvous used outside a valid create/offer/poll sequence
    Protocol,
    /// Configuration rejected
    Config,
    /// Anything else
    Internal,
    /// Caller-defined class
    Custom(&'static str),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => f.write_str("not-found"),
            ErrorKind::Conflict => f.write_str("conflict"),
            ErrorKind::Validation => f.write_str("validation"),
            ErrorKind::Unavailable => f.write_str("unavailable"),
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::NestedTransaction => f.write_str("nested-transaction"),
            ErrorKind::NonExistentTransaction => f.write_str("non-existent-transaction"),
            ErrorKind::TransactionalResource => f.write_str("transactional-resource"),
            ErrorKind::Protocol => f.write_str("protocol"),
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Internal => f.write_str("internal"),
            ErrorKind::Custom(name) => f.write_str(name),
        }
    }
}

/// Caller-defined class names recovered by [`ErrorKind::from_name`]
static CUSTOM_KINDS: Lazy<Mutex<HashSet<&'static str>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

/// Distinct custom names [`ErrorKind::from_name`] will intern
const MAX_CUSTOM_KINDS: usize = 256;

impl ErrorKind {
    /// Recover a class from its [`Display`](fmt::Display) name
    ///
    /// Built-in names map to their variant. Any other name becomes
    /// `Custom`, interned once per distinct name; past
    /// `MAX_CUSTOM_KINDS` distinct names it falls back to `Internal`.
    pub fn from_name(name: &str) -> ErrorKind {
        match name {
            "not-found" => ErrorKind::NotFound,
            "conflict" => ErrorKind::Conflict,
            "validation" => ErrorKind::Validation,
            "unavailable" => ErrorKind::Unavailable,
            "timeout" => ErrorKind::Timeout,
            "nested-transaction" => ErrorKind::NestedTransaction,
            "non-existent-transaction" => ErrorKind::NonExistentTransaction,
            "transactional-resource" => ErrorKind::TransactionalResource,
            "protocol" => ErrorKind::Protocol,
            "config" => ErrorKind::Config,
            "internal" => ErrorKind::Internal,
            other => {
                let mut names = CUSTOM_KINDS.lock();
                if let Some(interned) = names.get(other) {
                    return ErrorKind::Custom(*interned);
                }
                if names.len() >= MAX_CUSTOM_KINDS {
                    return ErrorKind::Internal;
                }
                let interned: &'static str = Box::leak(other.to_owned().into_boxed_str());
                names.insert(interned);
                ErrorKind::Custom(interned)
            }
        }
    }
}

/// Errors that carry a runtime class tag
pub trait Classify {
    /// The class this error belongs to
    fn kind(&self) -> ErrorKind;
}

/// Failure reported by an underlying resource client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Entity not found (reads only)
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or version constraint violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Request rejected as invalid
    #[error("validation failed: {0}")]
    Validation(String),

    /// Resource could not be reached
    #[error("resource unavailable: {0}")]
    Unavailable(String),

    /// Domain failure with a caller-defined class
    #[error("{kind}: {message}")]
    Domain {
        /// Class name, matched as [`ErrorKind::Custom`]
        kind: &'static str,
        /// Human readable description
        message: String,
    },

    /// Unclassified failure
    #[error("resource error: {0}")]
    Other(String),
}

impl Classify for ResourceError {
    fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::NotFound(_) => ErrorKind::NotFound,
            ResourceError::Conflict(_) => ErrorKind::Conflict,
            ResourceError::Validation(_) => ErrorKind::Validation,
            ResourceError::Unavailable(_) => ErrorKind::Unavailable,
            ResourceError::Domain { kind, .. } => ErrorKind::Custom(*kind),
            ResourceError::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Error type surfaced by Conduit to calling code
#[derive(Debug, Error)]
pub enum ConduitError {
    /// `begin` called while a transaction is already active
    #[error("transaction {0} is already active")]
    NestedTransaction(TransactionId),

    /// commit, abort or a mutation called with no active transaction
    #[error("no active transaction")]
    NonExistentTransaction,

    /// A resource failed during commit
    ///
    /// Resources earlier in commit order have already committed and are not
    /// rolled back.
    #[error("commit failed on {resource}: {source}")]
    TransactionalResource {
        /// The resource whose commit failed
        resource: ResourceKind,
        /// The underlying failure
        #[source]
        source: ResourceError,
    },

    /// A rendezvous poll elapsed before a result was offered
    #[error("timed out after {waited:?} waiting for result {cell}")]
    Timeout {
        /// The cell that was discarded
        cell: CellId,
        /// How long the poller waited
        waited: Duration,
    },

    /// Rendezvous used outside a valid create/offer/poll sequence
    #[error("rendezvous protocol violation: {0}")]
    Protocol(String),

    /// Failure reported directly by a resource client
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A deferred operation completed with a failure
    #[error("deferred operation failed: {message}")]
    OperationFailed {
        /// Class reported by the offering side
        kind: ErrorKind,
        /// Description supplied by the offering side
        message: String,
    },

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ConduitError {
    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        ConduitError::Protocol(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ConduitError::Config(message.into())
    }

    /// Create an operation failure classed as `Internal`
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::operation_failed_as(ErrorKind::Internal, message)
    }

    /// Create an operation failure with an explicit class
    pub fn operation_failed_as(kind: ErrorKind, message: impl Into<String>) -> Self {
        ConduitError::OperationFailed {
            kind,
            message: message.into(),
        }
    }

    /// True for the structural transaction errors (nested / non-existent)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ConduitError::NestedTransaction(_) | ConduitError::NonExistentTransaction
        )
    }
}

impl Classify for ConduitError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConduitError::NestedTransaction(_) => ErrorKind::NestedTransaction,
            ConduitError::NonExistentTransaction => ErrorKind::NonExistentTransaction,
            ConduitError::TransactionalResource { .. } => ErrorKind::TransactionalResource,
            ConduitError::Timeout { .. } => ErrorKind::Timeout,
            ConduitError::Protocol(_) => ErrorKind::Protocol,
            ConduitError::Resource(e) => e.kind(),
            ConduitError::OperationFailed { kind, .. } => *kind,
            ConduitError::Config(_) => ErrorKind::Config,
        }
    }
}
