//! Transactional blob store

use crate::action::{Action, ActionHandler, ActionKind, Operation};
use crate::buffer::PendingActions;
use crate::participant::{TransactionBuffers, TransactionalResource};
use conduit_core::{OperationContext, ResourceKind, Result, TransactionId};
use conduit_resources::BlobStore;
use std::sync::Arc;

/// Blob-store mutation queued in a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOp {
    /// Create or overwrite the blob at `path`
    Write {
        /// Blob path
        path: String,
        /// Blob content
        blob: Vec<u8>,
    },
    /// Remove the blob at `path`
    Delete {
        /// Blob path
        path: String,
    },
}

impl Operation for BlobOp {
    fn kind(&self) -> ActionKind {
        match self {
            BlobOp::Write { .. } => ActionKind::Write,
            BlobOp::Delete { .. } => ActionKind::Delete,
        }
    }
}

/// Blob store whose writes and deletes are buffered until commit
pub struct TransactionalBlobStore {
    store: Arc<dyn BlobStore>,
    buffers: TransactionBuffers<BlobOp>,
}

impl TransactionalBlobStore {
    /// Wrap a blob store
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            buffers: TransactionBuffers::new(ResourceKind::BlobStore),
        }
    }

    /// Queue a write
    pub fn write(
        &self,
        ctx: &OperationContext,
        path: impl Into<String>,
        blob: Vec<u8>,
    ) -> Result<()> {
        self.write_with(ctx, path, blob, Vec::new())
    }

    /// Queue a write with exception handlers
    pub fn write_with(
        &self,
        ctx: &OperationContext,
        path: impl Into<String>,
        blob: Vec<u8>,
        handlers: Vec<ActionHandler>,
    ) -> Result<()> {
        let op = BlobOp::Write {
            path: path.into(),
            blob,
        };
        self.buffers
            .enqueue(ctx, Action::new(op).with_handlers(handlers))
    }

    /// Queue a delete
    pub fn delete(&self, ctx: &OperationContext, path: impl Into<String>) -> Result<()> {
        self.delete_with(ctx, path, Vec::new())
    }

    /// Queue a delete with exception handlers
    pub fn delete_with(
        &self,
        ctx: &OperationContext,
        path: impl Into<String>,
        handlers: Vec<ActionHandler>,
    ) -> Result<()> {
        let op = BlobOp::Delete { path: path.into() };
        self.buffers
            .enqueue(ctx, Action::new(op).with_handlers(handlers))
    }

    /// Read committed state
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.store.read(path)?)
    }

    /// List committed paths under `dir`
    pub fn list(&self, dir: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        Ok(self.store.list(dir, prefix)?)
    }

    /// Actions pending for `txn_id`
    pub fn pending(&self, txn_id: TransactionId) -> Option<PendingActions> {
        self.buffers.pending(txn_id)
    }
}

impl TransactionalResource for TransactionalBlobStore {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::BlobStore
    }

    fn begin(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.begin(txn_id)
    }

    fn commit(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.commit_with(txn_id, |op| match op {
            BlobOp::Write { path, blob } => self.store.write(path, blob),
            BlobOp::Delete { path } => self.store.delete(path),
        })
    }

    fn abort(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.discard(txn_id).map(|_| ())
    }
}
