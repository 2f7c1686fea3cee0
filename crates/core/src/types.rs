//! Core identifier types for Conduit
//!
//! This module defines the foundational identifiers:
//! - TransactionId: Identifies one in-flight multi-resource transaction
//! - CellId: Identifies one rendezvous cell (continuation or pending result)
//! - InstanceId: Identifies one process instance sharing a broadcast channel
//! - ResourceKind: Discriminates the four transactional resource slots

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier using UUID v4
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from raw bytes
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Parse an identifier from its string representation
            ///
            /// Returns None if the string is not a valid UUID.
            pub fn from_string(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map(Self)
            }

            /// Get the raw bytes of this identifier
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a transaction
    ///
    /// Generated at `begin` and used by every participating resource to key
    /// its buffer of pending actions.
    TransactionId
);

uuid_id!(
    /// Unique identifier for a rendezvous cell
    CellId
);

uuid_id!(
    /// Identity of one process instance
    ///
    /// Cross-process offers are addressed to the instance that created the
    /// target cell; every other instance ignores them.
    InstanceId
);

/// The transactional resource slots a coordinator can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Key-value item store (enforces uniqueness, commits first)
    ItemStore,
    /// Blob store
    BlobStore,
    /// Message-queue sender
    Sender,
    /// Publish-subscribe publisher (notifies observers, commits last)
    Publisher,
}

impl ResourceKind {
    /// Order in which commit and abort visit resources.
    ///
    /// The item store goes first so a uniqueness failure leaves every other
    /// resource untouched; the publisher goes last so events are only emitted
    /// once every other effect succeeded.
    pub const COMMIT_ORDER: [ResourceKind; 4] = [
        ResourceKind::ItemStore,
        ResourceKind::BlobStore,
        ResourceKind::Sender,
        ResourceKind::Publisher,
    ];

    /// Order in which begin visits resources (reverse of commit)
    pub const BEGIN_ORDER: [ResourceKind; 4] = [
        ResourceKind::Publisher,
        ResourceKind::Sender,
        ResourceKind::BlobStore,
        ResourceKind::ItemStore,
    ];

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ItemStore => "item-store",
            ResourceKind::BlobStore => "blob-store",
            ResourceKind::Sender => "sender",
            ResourceKind::Publisher => "publisher",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
