//! Transactional pub/sub publisher

use crate::action::{Action, ActionHandler, ActionKind, Operation};
use crate::buffer::PendingActions;
use crate::participant::{TransactionBuffers, TransactionalResource};
use conduit_core::{OperationContext, ResourceKind, Result, TransactionId};
use conduit_resources::{Message, Publisher};
use std::sync::Arc;

/// Publish queued in a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOp(pub Message);

impl Operation for PublishOp {
    fn kind(&self) -> ActionKind {
        ActionKind::Publish
    }
}

/// Publisher whose publishes are buffered until commit
pub struct TransactionalPublisher {
    publisher: Arc<dyn Publisher>,
    buffers: TransactionBuffers<PublishOp>,
}

impl TransactionalPublisher {
    /// Wrap a publisher
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher,
            buffers: TransactionBuffers::new(ResourceKind::Publisher),
        }
    }

    /// Queue a publish
    pub fn publish(&self, ctx: &OperationContext, message: Message) -> Result<()> {
        self.publish_with(ctx, message, Vec::new())
    }

    /// Queue a publish with exception handlers
    pub fn publish_with(
        &self,
        ctx: &OperationContext,
        message: Message,
        handlers: Vec<ActionHandler>,
    ) -> Result<()> {
        self.buffers
            .enqueue(ctx, Action::new(PublishOp(message)).with_handlers(handlers))
    }

    /// Actions pending for `txn_id`
    pub fn pending(&self, txn_id: TransactionId) -> Option<PendingActions> {
        self.buffers.pending(txn_id)
    }
}

impl TransactionalResource for TransactionalPublisher {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Publisher
    }

    fn begin(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.begin(txn_id)
    }

    fn commit(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers
            .commit_with(txn_id, |PublishOp(message)| self.publisher.publish(message))
    }

    fn abort(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.discard(txn_id).map(|_| ())
    }
}
