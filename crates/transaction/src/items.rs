//! Transactional item store

use crate::action::{Action, ActionHandler, ActionKind, Operation};
use crate::buffer::PendingActions;
use crate::participant::{TransactionBuffers, TransactionalResource};
use conduit_core::{OperationContext, ResourceError, ResourceKind, Result, TransactionId};
use conduit_resources::{Item, ItemStore, Query};
use std::sync::Arc;

/// Item-store mutation queued in a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOp {
    /// Insert a new item (provisional version 1)
    Create(Item),
    /// Replace an item (provisional version already incremented)
    Update(Item),
    /// Remove an item at its current version
    Delete(Item),
}

impl Operation for ItemOp {
    fn kind(&self) -> ActionKind {
        match self {
            ItemOp::Create(_) => ActionKind::Create,
            ItemOp::Update(_) => ActionKind::Update,
            ItemOp::Delete(_) => ActionKind::Delete,
        }
    }
}

/// Item store whose mutations are buffered until commit
///
/// `create` and `update` return the item with its provisional version so
/// later actions in the same transaction can refer to it. Reads go straight
/// to the store and do not see uncommitted actions.
pub struct TransactionalItemStore {
    store: Arc<dyn ItemStore>,
    buffers: TransactionBuffers<ItemOp>,
}

impl TransactionalItemStore {
    /// Wrap an item store
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            buffers: TransactionBuffers::new(ResourceKind::ItemStore),
        }
    }

    /// Queue a create; the returned item has provisional version 1
    pub fn create(&self, ctx: &OperationContext, item: Item) -> Result<Item> {
        self.create_with(ctx, item, Vec::new())
    }

    /// Queue a create with exception handlers
    pub fn create_with(
        &self,
        ctx: &OperationContext,
        item: Item,
        handlers: Vec<ActionHandler>,
    ) -> Result<Item> {
        let provisional = item.with_version(1);
        self.buffers.enqueue(
            ctx,
            Action::new(ItemOp::Create(provisional.clone())).with_handlers(handlers),
        )?;
        Ok(provisional)
    }

    /// Queue an update; the returned item carries the next version
    pub fn update(&self, ctx: &OperationContext, item: Item) -> Result<Item> {
        self.update_with(ctx, item, Vec::new())
    }

    /// Queue an update with exception handlers
    pub fn update_with(
        &self,
        ctx: &OperationContext,
        item: Item,
        handlers: Vec<ActionHandler>,
    ) -> Result<Item> {
        let next = item.version.checked_add(1).ok_or_else(|| {
            ResourceError::Conflict(format!("item '{}' is at the maximum version", item.key))
        })?;
        let provisional = item.with_version(next);
        self.buffers.enqueue(
            ctx,
            Action::new(ItemOp::Update(provisional.clone())).with_handlers(handlers),
        )?;
        Ok(provisional)
    }

    /// Queue a delete
    pub fn delete(&self, ctx: &OperationContext, item: Item) -> Result<()> {
        self.delete_with(ctx, item, Vec::new())
    }

    /// Queue a delete with exception handlers
    pub fn delete_with(
        &self,
        ctx: &OperationContext,
        item: Item,
        handlers: Vec<ActionHandler>,
    ) -> Result<()> {
        self.buffers
            .enqueue(ctx, Action::new(ItemOp::Delete(item)).with_handlers(handlers))
    }

    /// Read committed state
    pub fn read(&self, key: &str) -> Result<Item> {
        Ok(self.store.read(key)?)
    }

    /// Query committed state
    pub fn fetch(&self, query: &Query) -> Result<Vec<Item>> {
        Ok(self.store.fetch(query)?)
    }

    /// Actions pending for `txn_id`
    pub fn pending(&self, txn_id: TransactionId) -> Option<PendingActions> {
        self.buffers.pending(txn_id)
    }
}

impl TransactionalResource for TransactionalItemStore {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::ItemStore
    }

    fn begin(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.begin(txn_id)
    }

    fn commit(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.commit_with(txn_id, |op| match op {
            ItemOp::Create(item) => self.store.create(item.clone()).map(|_| ()),
            ItemOp::Update(item) => self.store.update(item.clone()).map(|_| ()),
            ItemOp::Delete(item) => self.store.delete(item),
        })
    }

    fn abort(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.discard(txn_id).map(|_| ())
    }
}
