//! Ordered multi-resource transactions
//!
//! Resources in this crate are not transactional themselves. Each wrapper
//! buffers its mutations per transaction and applies them at commit time;
//! the [`TransactionCoordinator`] drives the wrappers in a fixed order so
//! that partial failures leave the system in the least surprising state.
//!
//! - [`TransactionalItemStore`], [`TransactionalBlobStore`],
//!   [`TransactionalSender`], [`TransactionalPublisher`]: resource wrappers
//! - [`TransactionBuffers`]: per-transaction buffers shared by the wrappers
//! - [`ActionHandler`]: per-action recovery from classified failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod blobs;
pub mod buffer;
pub mod coordinator;
pub mod items;
pub mod participant;
pub mod publisher;
pub mod sender;

pub use action::{Action, ActionHandler, ActionKind, Operation};
pub use blobs::{BlobOp, TransactionalBlobStore};
pub use buffer::{ApplyResult, PendingActions, TransactionBuffer};
pub use coordinator::{AbortReport, CoordinatorBuilder, CoordinatorStats, TransactionCoordinator};
pub use items::{ItemOp, TransactionalItemStore};
pub use participant::{TransactionBuffers, TransactionalResource};
pub use publisher::{PublishOp, TransactionalPublisher};
pub use sender::{SendOp, TransactionalSender};
