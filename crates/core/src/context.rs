//! Per-operation context
//!
//! An [`OperationContext`] is created by request-handling code for one
//! logical operation and passed explicitly to the coordinator, the resource
//! wrappers and the continuation registry. It owns the active transaction
//! and the id of the continuation the operation is deferred on.

use crate::error::{ConduitError, Result};
use crate::types::{CellId, TransactionId};
use chrono::{DateTime, Utc};
use std::fmt;

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `NotStarted` → `Active` (begin)
/// - `Active` → `Committed` (every resource committed)
/// - `Active` → `Aborted` (abort)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Created but not begun
    NotStarted,
    /// Begun; resources are buffering actions
    Active,
    /// Every resource committed
    Committed,
    /// Aborted; buffered actions were discarded
    Aborted,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::NotStarted => "not-started",
            TransactionStatus::Active => "active",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// One multi-resource transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    status: TransactionStatus,
    started_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a transaction with a fresh id in `NotStarted` state
    pub fn new() -> Self {
        Self {
            id: TransactionId::new(),
            status: TransactionStatus::NotStarted,
            started_at: Utc::now(),
        }
    }

    /// Transaction id
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// When the transaction object was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// True while the transaction is `Active`
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    fn transition(&mut self, to: TransactionStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (TransactionStatus::NotStarted, TransactionStatus::Active)
                | (TransactionStatus::Active, TransactionStatus::Committed)
                | (TransactionStatus::Active, TransactionStatus::Aborted)
        );
        if !allowed {
            return Err(ConduitError::protocol(format!(
                "transaction {} cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// State carried through one logical operation
#[derive(Debug, Default)]
pub struct OperationContext {
    transaction: Option<Transaction>,
    continuation: Option<CellId>,
}

impl OperationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// The attached transaction, if any
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// True if an active transaction is attached
    pub fn in_transaction(&self) -> bool {
        self.transaction.as_ref().is_some_and(Transaction::is_active)
    }

    /// Id of the active transaction
    ///
    /// # Errors
    ///
    /// `NonExistentTransaction` if no active transaction is attached.
    pub fn active_transaction(&self) -> Result<TransactionId> {
        match &self.transaction {
            Some(txn) if txn.is_active() => Ok(txn.id),
            _ => Err(ConduitError::NonExistentTransaction),
        }
    }

    /// Activate and attach `txn`
    ///
    /// # Errors
    ///
    /// `NestedTransaction` if an active transaction is already attached.
    pub fn attach(&mut self, mut txn: Transaction) -> Result<TransactionId> {
        if let Some(current) = &self.transaction {
            if current.is_active() {
                return Err(ConduitError::NestedTransaction(current.id));
            }
        }
        txn.transition(TransactionStatus::Active)?;
        let id = txn.id;
        self.transaction = Some(txn);
        Ok(id)
    }

    /// Move the active transaction to `status` and detach it
    ///
    /// # Errors
    ///
    /// `NonExistentTransaction` if no active transaction is attached.
    pub fn finish(&mut self, status: TransactionStatus) -> Result<Transaction> {
        self.active_transaction()?;
        let mut txn = self
            .transaction
            .take()
            .ok_or(ConduitError::NonExistentTransaction)?;
        txn.transition(status)?;
        Ok(txn)
    }

    /// Continuation this operation is deferred on, if any
    pub fn continuation(&self) -> Option<CellId> {
        self.continuation
    }

    /// Record the continuation this operation is deferred on
    ///
    /// # Errors
    ///
    /// `Protocol` if a continuation is already recorded.
    pub fn set_continuation(&mut self, id: CellId) -> Result<()> {
        if let Some(existing) = self.continuation {
            return Err(ConduitError::protocol(format!(
                "operation is already deferred on continuation {}",
                existing
            )));
        }
        self.continuation = Some(id);
        Ok(())
    }

    /// Clear and return the recorded continuation
    pub fn take_continuation(&mut self) -> Option<CellId> {
        self.continuation.take()
    }
}
