//! Resource clients for Conduit
//!
//! Defines the narrow traits through which Conduit reaches the outside world
//! (item store, blob store, queue sender, pub/sub publisher, broadcast
//! channel) and in-memory implementations of each.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod model;
pub mod traits;

pub use memory::{
    InMemoryBlobStore, InMemoryBroadcast, InMemoryItemStore, InMemoryPublisher, InMemoryQueue,
    QueuedMessage,
};
pub use model::{Item, Message, Query};
pub use traits::{
    BlobStore, BroadcastChannel, ItemStore, Publisher, QueueSender, Subscriber, SubscriptionId,
};
