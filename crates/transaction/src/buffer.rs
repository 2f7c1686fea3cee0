//! Transaction buffers
//!
//! A [`TransactionBuffer`] is the FIFO queue of actions one resource has
//! accepted for one transaction. Nothing touches the resource until the
//! buffer is drained at commit.

use crate::action::{Action, ActionKind, Operation};
use conduit_core::{ResourceError, ResourceResult, TransactionId};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

/// Summary of actions that would be applied on commit or discarded on abort
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingActions {
    counts: BTreeMap<ActionKind, usize>,
}

impl PendingActions {
    /// Number of pending actions of `kind`
    pub fn count(&self, kind: ActionKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of pending actions
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Outcome of draining a buffer into its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyResult {
    /// Actions the resource accepted
    pub applied: usize,
    /// Actions that failed but were recovered by a handler
    pub recovered: usize,
}

/// Ordered queue of pending actions for one resource and one transaction
#[derive(Debug)]
pub struct TransactionBuffer<Op> {
    txn_id: TransactionId,
    actions: VecDeque<Action<Op>>,
}

impl<Op: Operation> TransactionBuffer<Op> {
    /// Create an empty buffer
    pub fn new(txn_id: TransactionId) -> Self {
        Self {
            txn_id,
            actions: VecDeque::new(),
        }
    }

    /// Transaction this buffer belongs to
    pub fn txn_id(&self) -> TransactionId {
        self.txn_id
    }

    /// Queue an action at the back
    pub fn push(&mut self, action: Action<Op>) {
        self.actions.push_back(action);
    }

    /// Number of queued actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Queued actions in application order
    pub fn actions(&self) -> impl Iterator<Item = &Action<Op>> {
        self.actions.iter()
    }

    /// Count queued actions by kind
    pub fn pending(&self) -> PendingActions {
        let mut counts = BTreeMap::new();
        for action in &self.actions {
            *counts.entry(action.kind()).or_insert(0) += 1;
        }
        PendingActions { counts }
    }

    /// Apply every action in FIFO order, consuming the buffer
    ///
    /// A failing action is offered to its own handlers; if one recovers,
    /// draining continues. Otherwise the failure is returned and the actions
    /// behind it are dropped without being applied.
    pub fn apply<F>(self, mut apply: F) -> ResourceResult<ApplyResult>
    where
        F: FnMut(&Op) -> ResourceResult<()>,
    {
        let txn_id = self.txn_id;
        let mut result = ApplyResult::default();
        let mut remaining = self.actions;

        while let Some(action) = remaining.pop_front() {
            let error: ResourceError = match apply(action.op()) {
                Ok(()) => {
                    result.applied += 1;
                    continue;
                }
                Err(error) => error,
            };

            match action.recover(&error) {
                Some(handler) => {
                    debug!(
                        target: "conduit::txn",
                        txn_id = %txn_id,
                        action = %action.kind(),
                        handler,
                        error = %error,
                        "Action failure recovered by handler"
                    );
                    result.recovered += 1;
                }
                None => {
                    warn!(
                        target: "conduit::txn",
                        txn_id = %txn_id,
                        action = %action.kind(),
                        skipped = remaining.len(),
                        error = %error,
                        "Action failed, remaining actions not applied"
                    );
                    return Err(error);
                }
            }
        }

        Ok(result)
    }
}
