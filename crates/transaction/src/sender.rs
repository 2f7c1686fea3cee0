//! Transactional queue sender

use crate::action::{Action, ActionHandler, ActionKind, Operation};
use crate::buffer::PendingActions;
use crate::participant::{TransactionBuffers, TransactionalResource};
use conduit_core::{OperationContext, ResourceKind, Result, TransactionId};
use conduit_resources::{Message, QueueSender};
use std::sync::Arc;

/// Queue send queued in a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum SendOp {
    /// Immediate delivery
    Send(Message),
    /// Delivery after the given number of seconds
    SendDelayed(Message, u64),
}

impl Operation for SendOp {
    fn kind(&self) -> ActionKind {
        match self {
            SendOp::Send(_) => ActionKind::Send,
            SendOp::SendDelayed(..) => ActionKind::SendDelayed,
        }
    }
}

/// Queue sender whose sends are buffered until commit
pub struct TransactionalSender {
    sender: Arc<dyn QueueSender>,
    buffers: TransactionBuffers<SendOp>,
}

impl TransactionalSender {
    /// Wrap a queue sender
    pub fn new(sender: Arc<dyn QueueSender>) -> Self {
        Self {
            sender,
            buffers: TransactionBuffers::new(ResourceKind::Sender),
        }
    }

    /// Queue a send
    pub fn send(&self, ctx: &OperationContext, message: Message) -> Result<()> {
        self.send_with(ctx, message, Vec::new())
    }

    /// Queue a send with exception handlers
    pub fn send_with(
        &self,
        ctx: &OperationContext,
        message: Message,
        handlers: Vec<ActionHandler>,
    ) -> Result<()> {
        self.buffers
            .enqueue(ctx, Action::new(SendOp::Send(message)).with_handlers(handlers))
    }

    /// Queue a delayed send
    pub fn send_delayed(
        &self,
        ctx: &OperationContext,
        message: Message,
        delay_seconds: u64,
    ) -> Result<()> {
        self.send_delayed_with(ctx, message, delay_seconds, Vec::new())
    }

    /// Queue a delayed send with exception handlers
    pub fn send_delayed_with(
        &self,
        ctx: &OperationContext,
        message: Message,
        delay_seconds: u64,
        handlers: Vec<ActionHandler>,
    ) -> Result<()> {
        self.buffers.enqueue(
            ctx,
            Action::new(SendOp::SendDelayed(message, delay_seconds)).with_handlers(handlers),
        )
    }

    /// Actions pending for `txn_id`
    pub fn pending(&self, txn_id: TransactionId) -> Option<PendingActions> {
        self.buffers.pending(txn_id)
    }
}

impl TransactionalResource for TransactionalSender {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Sender
    }

    fn begin(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.begin(txn_id)
    }

    fn commit(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.commit_with(txn_id, |op| match op {
            SendOp::Send(message) => self.sender.send(message),
            SendOp::SendDelayed(message, delay) => self.sender.send_delayed(message, *delay),
        })
    }

    fn abort(&self, txn_id: TransactionId) -> Result<()> {
        self.buffers.discard(txn_id).map(|_| ())
    }
}
