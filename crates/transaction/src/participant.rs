//! Transactional participants
//!
//! [`TransactionalResource`] is the seam between the coordinator and each
//! resource. [`TransactionBuffers`] holds the per-transaction buffers every
//! resource wrapper keeps, and enforces the structural rules: one buffer per
//! transaction, no mutation without a begun transaction.

use crate::action::{Action, Operation};
use crate::buffer::{PendingActions, TransactionBuffer};
use conduit_core::{ConduitError, OperationContext, ResourceKind, Result, TransactionId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

/// A resource that takes part in coordinated transactions
pub trait TransactionalResource: Send + Sync {
    /// Slot this resource occupies in the coordinator
    fn resource_kind(&self) -> ResourceKind;

    /// Start buffering for `txn_id`
    ///
    /// # Errors
    ///
    /// `NestedTransaction` if `txn_id` is already begun on this resource.
    fn begin(&self, txn_id: TransactionId) -> Result<()>;

    /// Apply every buffered action for `txn_id`
    ///
    /// # Errors
    ///
    /// `NonExistentTransaction` if `txn_id` was never begun here, or
    /// `TransactionalResource` if the underlying resource failed.
    fn commit(&self, txn_id: TransactionId) -> Result<()>;

    /// Discard every buffered action for `txn_id`
    ///
    /// # Errors
    ///
    /// `NonExistentTransaction` if `txn_id` was never begun here.
    fn abort(&self, txn_id: TransactionId) -> Result<()>;
}

/// Per-transaction buffers for one resource
pub struct TransactionBuffers<Op> {
    resource: ResourceKind,
    buffers: DashMap<TransactionId, TransactionBuffer<Op>>,
}

impl<Op: Operation> TransactionBuffers<Op> {
    /// Create an empty set of buffers for `resource`
    pub fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            buffers: DashMap::new(),
        }
    }

    /// Resource these buffers belong to
    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    /// Open a buffer for `txn_id`
    pub fn begin(&self, txn_id: TransactionId) -> Result<()> {
        match self.buffers.entry(txn_id) {
            Entry::Occupied(_) => Err(ConduitError::NestedTransaction(txn_id)),
            Entry::Vacant(slot) => {
                slot.insert(TransactionBuffer::new(txn_id));
                trace!(
                    target: "conduit::txn",
                    resource = %self.resource,
                    txn_id = %txn_id,
                    "Buffer opened"
                );
                Ok(())
            }
        }
    }

    /// Queue an action in the buffer of the context's active transaction
    pub fn enqueue(&self, ctx: &OperationContext, action: Action<Op>) -> Result<()> {
        let txn_id = ctx.active_transaction()?;
        let mut buffer = self
            .buffers
            .get_mut(&txn_id)
            .ok_or(ConduitError::NonExistentTransaction)?;
        trace!(
            target: "conduit::txn",
            resource = %self.resource,
            txn_id = %txn_id,
            action = %action.kind(),
            position = buffer.len(),
            "Action queued"
        );
        buffer.push(action);
        Ok(())
    }

    /// Remove and return the buffer for `txn_id`
    pub fn take(&self, txn_id: TransactionId) -> Result<TransactionBuffer<Op>> {
        self.buffers
            .remove(&txn_id)
            .map(|(_, buffer)| buffer)
            .ok_or(ConduitError::NonExistentTransaction)
    }

    /// Drop the buffer for `txn_id`, returning how many actions it held
    pub fn discard(&self, txn_id: TransactionId) -> Result<usize> {
        let buffer = self.take(txn_id)?;
        let discarded = buffer.len();
        debug!(
            target: "conduit::txn",
            resource = %self.resource,
            txn_id = %txn_id,
            discarded,
            "Buffer discarded"
        );
        Ok(discarded)
    }

    /// Summary of the actions pending for `txn_id`
    pub fn pending(&self, txn_id: TransactionId) -> Option<PendingActions> {
        self.buffers.get(&txn_id).map(|buffer| buffer.pending())
    }

    /// Whether `txn_id` has an open buffer
    pub fn is_open(&self, txn_id: TransactionId) -> bool {
        self.buffers.contains_key(&txn_id)
    }

    /// Number of open buffers
    pub fn open_count(&self) -> usize {
        self.buffers.len()
    }

    /// Drain the buffer for `txn_id` into the resource with `apply`
    ///
    /// Resource failures are wrapped as `TransactionalResource`.
    pub fn commit_with<F>(&self, txn_id: TransactionId, apply: F) -> Result<()>
    where
        F: FnMut(&Op) -> conduit_core::ResourceResult<()>,
    {
        let buffer = self.take(txn_id)?;
        let queued = buffer.len();
        let result = buffer
            .apply(apply)
            .map_err(|source| ConduitError::TransactionalResource {
                resource: self.resource,
                source,
            })?;
        debug!(
            target: "conduit::txn",
            resource = %self.resource,
            txn_id = %txn_id,
            queued,
            applied = result.applied,
            recovered = result.recovered,
            "Buffer committed"
        );
        Ok(())
    }
}
