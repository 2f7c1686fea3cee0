//! Conduit - ordered multi-resource transactions and deferred-result rendezvous
//!
//! Conduit lets request-handling code affect an item store, a blob store, a
//! queue and a pub/sub broker as one logical operation, block on results
//! produced by other threads or instances, and retry fallible operations
//! under a bounded policy.
//!
//! # Quick Start
//!
//! ```ignore
//! use conduit::{ConduitConfig, Item, OperationContext, Runtime};
//!
//! let runtime = Runtime::builder(ConduitConfig::default())
//!     .item_store(items)
//!     .publisher(broker)
//!     .build()?;
//!
//! let mut ctx = OperationContext::new();
//! runtime.transaction(&mut ctx, |ctx| {
//!     runtime.items().unwrap().create(ctx, Item::new("order:1", body))?;
//!     runtime.publisher().unwrap().publish(ctx, created_event)?;
//!     Ok(())
//! })?;
//! ```
//!
//! # Architecture
//!
//! - `conduit-core`: ids, errors, configuration and [`OperationContext`]
//! - `conduit-resources`: collaborator traits and in-memory implementations
//! - `conduit-transaction`: buffered resource wrappers and the coordinator
//! - `conduit-rendezvous`: continuation and pending-result registries
//! - `conduit-retry`: bounded retry with handler dispatch

#![warn(missing_docs)]
#![warn(clippy::all)]

mod runtime;

pub use runtime::{Runtime, RuntimeBuilder};

pub use conduit_core::{
    CellId, Classify, ConduitConfig, ConduitError, ErrorKind, InstanceId, OperationContext,
    RendezvousSettings, ResourceError, ResourceKind, ResourceResult, Result, RetrySettings,
    Transaction, TransactionId, TransactionStatus, CONFIG_FILE_NAME, MAX_RENDEZVOUS_TIMEOUT_SECS,
};
pub use conduit_rendezvous::{
    CellState, Clock, ContinuationRegistry, ManualClock, OfferOutcome, PendingId,
    PendingResultRegistry, ResultOffer, SystemClock, DEFAULT_CONTINUATION_TIMEOUT,
    DEFAULT_PENDING_RESULT_TIMEOUT,
};
pub use conduit_resources::{
    BlobStore, BroadcastChannel, InMemoryBlobStore, InMemoryBroadcast, InMemoryItemStore,
    InMemoryPublisher, InMemoryQueue, Item, ItemStore, Message, Publisher, Query, QueueSender,
    QueuedMessage, Subscriber, SubscriptionId,
};
pub use conduit_retry::{
    retry_enabled, set_retry_enabled, ExceptionHandler, HandlerRegistry, RetryConfiguration,
    RetryExecutor, RetrySwitch, Sleeper, ThreadSleeper, ALWAYS_IMMEDIATE,
};
pub use conduit_transaction::{
    AbortReport, Action, ActionHandler, ActionKind, ApplyResult, BlobOp, CoordinatorBuilder,
    CoordinatorStats, ItemOp, Operation, PendingActions, PublishOp, SendOp, TransactionBuffer,
    TransactionBuffers, TransactionCoordinator, TransactionalBlobStore, TransactionalItemStore,
    TransactionalPublisher, TransactionalResource, TransactionalSender,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or by the configured
/// `log_filter` when `RUST_LOG` is unset
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(config: &ConduitConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
