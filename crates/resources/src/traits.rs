//! Resource client traits
//!
//! These are the only views Conduit has of the underlying resources. Every
//! method is a blocking call that returns when the resource has applied (or
//! rejected) the request.

use crate::model::{Item, Message, Query};
use conduit_core::ResourceResult;
use std::sync::Arc;

/// Key-value item store
///
/// Enforces uniqueness and optimistic versioning synchronously:
/// - `create` fails with `Conflict` if the key exists, and stores version 1
/// - `update` fails with `Conflict` unless `item.version` is exactly one more
///   than the stored version
/// - `delete` fails with `Conflict` unless `item.version` equals the stored
///   version
pub trait ItemStore: Send + Sync {
    /// Insert a new item
    fn create(&self, item: Item) -> ResourceResult<Item>;
    /// Replace an existing item
    fn update(&self, item: Item) -> ResourceResult<Item>;
    /// Remove an item
    fn delete(&self, item: &Item) -> ResourceResult<()>;
    /// Read one item, `NotFound` if absent
    fn read(&self, key: &str) -> ResourceResult<Item>;
    /// Read every item matching the query, in key order
    fn fetch(&self, query: &Query) -> ResourceResult<Vec<Item>>;
}

/// Blob store addressed by slash-separated paths
pub trait BlobStore: Send + Sync {
    /// Read a blob, `NotFound` if absent
    fn read(&self, path: &str) -> ResourceResult<Vec<u8>>;
    /// Create or overwrite a blob
    fn write(&self, path: &str, blob: &[u8]) -> ResourceResult<()>;
    /// Remove a blob
    fn delete(&self, path: &str) -> ResourceResult<()>;
    /// Paths under `dir` whose final segment starts with `prefix`
    fn list(&self, dir: &str, prefix: Option<&str>) -> ResourceResult<Vec<String>>;
}

/// Message-queue sender
pub trait QueueSender: Send + Sync {
    /// Enqueue a message for immediate delivery
    fn send(&self, message: &Message) -> ResourceResult<()>;
    /// Enqueue a message delivered after `delay_seconds`
    fn send_delayed(&self, message: &Message, delay_seconds: u64) -> ResourceResult<()>;
}

/// Pub/sub publisher
pub trait Publisher: Send + Sync {
    /// Publish a message to every subscriber of the topic
    fn publish(&self, message: &Message) -> ResourceResult<()>;
}

/// Callback invoked for every event delivered by a [`BroadcastChannel`]
pub type Subscriber<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`BroadcastChannel::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Channel that delivers every published event to every subscribed instance
pub trait BroadcastChannel<E>: Send + Sync {
    /// Publish an event to all subscribers
    fn publish(&self, event: E) -> ResourceResult<()>;
    /// Register a subscriber
    fn subscribe(&self, subscriber: Subscriber<E>) -> SubscriptionId;
    /// Remove a subscriber; returns `false` if it was not registered
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
