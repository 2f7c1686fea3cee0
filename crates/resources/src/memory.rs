//! In-memory resource implementations
//!
//! Reference implementations of every resource trait. They honour the same
//! constraints a real backend enforces (key uniqueness, optimistic versions,
//! `NotFound` on reads) and record what they were asked to do, which makes
//! them suitable for local runs and tests.

use crate::model::{Item, Message, Query};
use crate::traits::{
    BlobStore, BroadcastChannel, ItemStore, Publisher, QueueSender, Subscriber, SubscriptionId,
};
use conduit_core::{ResourceError, ResourceResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

// ============================================================================
// Item store
// ============================================================================

/// Item store backed by a `BTreeMap`
#[derive(Default)]
pub struct InMemoryItemStore {
    items: RwLock<BTreeMap<String, Item>>,
}

impl InMemoryItemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// True if no item is stored
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl ItemStore for InMemoryItemStore {
    fn create(&self, item: Item) -> ResourceResult<Item> {
        let mut items = self.items.write();
        if items.contains_key(&item.key) {
            return Err(ResourceError::Conflict(format!(
                "item '{}' already exists",
                item.key
            )));
        }
        let stored = item.with_version(1);
        trace!(target: "conduit::resources", key = %stored.key, "item created");
        items.insert(stored.key.clone(), stored.clone());
        Ok(stored)
    }

    fn update(&self, item: Item) -> ResourceResult<Item> {
        let mut items = self.items.write();
        let current = items
            .get(&item.key)
            .ok_or_else(|| ResourceError::NotFound(item.key.clone()))?;
        if item.version != current.version + 1 {
            return Err(ResourceError::Conflict(format!(
                "item '{}' is at version {}, cannot write version {}",
                item.key, current.version, item.version
            )));
        }
        trace!(
            target: "conduit::resources",
            key = %item.key,
            version = item.version,
            "item updated"
        );
        items.insert(item.key.clone(), item.clone());
        Ok(item)
    }

    fn delete(&self, item: &Item) -> ResourceResult<()> {
        let mut items = self.items.write();
        let current = items
            .get(&item.key)
            .ok_or_else(|| ResourceError::NotFound(item.key.clone()))?;
        if current.version != item.version {
            return Err(ResourceError::Conflict(format!(
                "item '{}' is at version {}, delete expected version {}",
                item.key, current.version, item.version
            )));
        }
        items.remove(&item.key);
        Ok(())
    }

    fn read(&self, key: &str) -> ResourceResult<Item> {
        self.items
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(key.to_string()))
    }

    fn fetch(&self, query: &Query) -> ResourceResult<Vec<Item>> {
        let items = self.items.read();
        let matching = items
            .range(query.prefix.clone()..)
            .take_while(|(key, _)| query.matches(key))
            .map(|(_, item)| item.clone());
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

// ============================================================================
// Blob store
// ============================================================================

/// Blob store backed by a `BTreeMap` of path → bytes
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// True if no blob is stored
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

fn dir_prefix(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

impl BlobStore for InMemoryBlobStore {
    fn read(&self, path: &str) -> ResourceResult<Vec<u8>> {
        self.blobs
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn write(&self, path: &str, blob: &[u8]) -> ResourceResult<()> {
        if path.is_empty() || path.ends_with('/') {
            return Err(ResourceError::Validation(format!(
                "'{}' is not a blob path",
                path
            )));
        }
        self.blobs.write().insert(path.to_string(), blob.to_vec());
        Ok(())
    }

    fn delete(&self, path: &str) -> ResourceResult<()> {
        self.blobs
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn list(&self, dir: &str, prefix: Option<&str>) -> ResourceResult<Vec<String>> {
        let dir = dir_prefix(dir);
        let blobs = self.blobs.read();
        Ok(blobs
            .keys()
            .filter_map(|path| {
                let rest = path.strip_prefix(dir.as_str())?;
                let name = rest.rsplit('/').next().unwrap_or(rest);
                match prefix {
                    Some(p) if !name.starts_with(p) => None,
                    _ => Some(path.clone()),
                }
            })
            .collect())
    }
}

// ============================================================================
// Queue sender
// ============================================================================

/// A message accepted by [`InMemoryQueue`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    /// The message
    pub message: Message,
    /// Delivery delay in seconds, 0 for immediate sends
    pub delay_seconds: u64,
}

/// Queue sender that keeps every accepted message in order
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<Vec<QueuedMessage>>,
}

impl InMemoryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every accepted message
    pub fn messages(&self) -> Vec<QueuedMessage> {
        self.messages.lock().clone()
    }

    /// Remove and return every accepted message
    pub fn drain(&self) -> Vec<QueuedMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl QueueSender for InMemoryQueue {
    fn send(&self, message: &Message) -> ResourceResult<()> {
        self.send_delayed(message, 0)
    }

    fn send_delayed(&self, message: &Message, delay_seconds: u64) -> ResourceResult<()> {
        self.messages.lock().push(QueuedMessage {
            message: message.clone(),
            delay_seconds,
        });
        Ok(())
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Publisher that keeps every published message in order
#[derive(Default)]
pub struct InMemoryPublisher {
    published: Mutex<Vec<Message>>,
}

impl InMemoryPublisher {
    /// Create an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every published message
    pub fn published(&self) -> Vec<Message> {
        self.published.lock().clone()
    }
}

impl Publisher for InMemoryPublisher {
    fn publish(&self, message: &Message) -> ResourceResult<()> {
        self.published.lock().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// Broadcast channel
// ============================================================================

/// Broadcast channel that delivers synchronously on the publishing thread
///
/// Every instance sharing one `InMemoryBroadcast` behaves like a separate
/// process subscribed to the same topic.
pub struct InMemoryBroadcast<E> {
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<E>)>>,
    next_id: AtomicU64,
}

impl<E> InMemoryBroadcast<E> {
    /// Create a channel with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<E> Default for InMemoryBroadcast<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + Sync> BroadcastChannel<E> for InMemoryBroadcast<E> {
    fn publish(&self, event: E) -> ResourceResult<()> {
        // Clone the list so a subscriber may subscribe or publish re-entrantly.
        let subscribers: Vec<_> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(&event);
        }
        Ok(())
    }

    fn subscribe(&self, subscriber: Subscriber<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, subscriber));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }
}
