//! Values exchanged with resource clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A versioned document in the item store
///
/// `version` is the optimistic-concurrency version. A freshly created item
/// has version 1 and each update increments it by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique key
    pub key: String,
    /// Optimistic version
    pub version: u64,
    /// Document body
    pub data: Value,
}

impl Item {
    /// Create an unversioned item (version 0, not yet persisted)
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            version: 0,
            data,
        }
    }

    /// Same item with a different version
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

/// Item-store query: key prefix plus an optional result limit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Only keys starting with this prefix match
    pub prefix: String,
    /// Maximum number of items returned
    pub limit: Option<usize>,
}

impl Query {
    /// Match every key starting with `prefix`
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            limit: None,
        }
    }

    /// Cap the number of returned items
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `key` satisfies the prefix filter
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

/// A message for the queue sender or the pub/sub publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id
    pub id: Uuid,
    /// Message body
    pub body: Value,
    /// String attributes (routing keys, content type, ...)
    pub attributes: BTreeMap<String, String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with a fresh id and no attributes
    pub fn new(body: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            body,
            attributes: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
