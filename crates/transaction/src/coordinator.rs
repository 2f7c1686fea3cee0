//! Transaction coordinator
//!
//! Drives begin/commit/abort across the configured resources in a fixed
//! order:
//!
//! ```text
//! begin:  publisher → sender → blob-store → item-store
//! commit: item-store → blob-store → sender → publisher
//! abort:  item-store → blob-store → sender → publisher
//! ```
//!
//! The item store commits first because it enforces uniqueness; if it fails
//! nothing else has been touched. The publisher commits last so observers are
//! only notified once every other effect has been applied.
//!
//! Commit fails fast: the first failing resource stops the sequence and the
//! error is returned. Resources already committed stay committed, and the
//! transaction stays attached so the caller can decide to abort the rest.
//!
//! Abort is exhaustive: every resource is attempted and failures are logged,
//! never returned.

use crate::participant::TransactionalResource;
use conduit_core::{
    ConduitError, OperationContext, ResourceKind, Result, Transaction, TransactionId,
    TransactionStatus,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coordinator metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorStats {
    /// Transactions currently active
    pub active: u64,
    /// Transactions begun
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions aborted
    pub aborted: u64,
    /// Commit attempts that failed on a resource
    pub commit_failures: u64,
}

/// What an abort did
#[derive(Debug)]
pub struct AbortReport {
    /// The detached transaction, now `Aborted`
    pub transaction: Transaction,
    /// Resources whose abort failed, with the failure message
    pub failures: Vec<(ResourceKind, String)>,
}

impl AbortReport {
    /// True if every resource aborted cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builder for [`TransactionCoordinator`]
#[derive(Default)]
pub struct CoordinatorBuilder {
    resources: BTreeMap<ResourceKind, Arc<dyn TransactionalResource>>,
}

impl CoordinatorBuilder {
    /// Register a resource in the slot named by its `resource_kind()`
    ///
    /// Registering a second resource for the same slot replaces the first.
    pub fn resource(mut self, resource: Arc<dyn TransactionalResource>) -> Self {
        self.resources.insert(resource.resource_kind(), resource);
        self
    }

    /// Build the coordinator
    pub fn build(self) -> TransactionCoordinator {
        TransactionCoordinator {
            resources: self.resources,
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
            commit_failures: AtomicU64::new(0),
        }
    }
}

/// Coordinates transactions across the configured resources
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering; they are observational only and
/// do not synchronize any other memory.
pub struct TransactionCoordinator {
    resources: BTreeMap<ResourceKind, Arc<dyn TransactionalResource>>,
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
    commit_failures: AtomicU64,
}

impl TransactionCoordinator {
    /// Start building a coordinator
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Configured resources in `order`, absent slots skipped
    fn in_order(
        &self,
        order: [ResourceKind; 4],
    ) -> impl Iterator<Item = &Arc<dyn TransactionalResource>> + '_ {
        order
            .into_iter()
            .filter_map(move |kind| self.resources.get(&kind))
    }

    /// Whether a resource is configured for `kind`
    pub fn has_resource(&self, kind: ResourceKind) -> bool {
        self.resources.contains_key(&kind)
    }

    /// Whether `ctx` has an active transaction
    pub fn in_transaction(&self, ctx: &OperationContext) -> bool {
        ctx.in_transaction()
    }

    /// Begin a transaction on `ctx`
    ///
    /// # Errors
    ///
    /// `NestedTransaction` if `ctx` already has an active transaction; no
    /// resource is called in that case. If a resource fails to begin, the
    /// resources already begun are aborted and the error is returned.
    pub fn begin(&self, ctx: &mut OperationContext) -> Result<TransactionId> {
        if let Some(active) = ctx.transaction().filter(|txn| txn.is_active()) {
            return Err(ConduitError::NestedTransaction(active.id()));
        }

        let txn = Transaction::new();
        let txn_id = txn.id();
        let mut begun: Vec<&Arc<dyn TransactionalResource>> = Vec::new();
        for resource in self.in_order(ResourceKind::BEGIN_ORDER) {
            if let Err(e) = resource.begin(txn_id) {
                warn!(
                    target: "conduit::txn",
                    txn_id = %txn_id,
                    resource = %resource.resource_kind(),
                    error = %e,
                    "Begin failed, releasing resources already begun"
                );
                for started in begun {
                    if let Err(abort_err) = started.abort(txn_id) {
                        warn!(
                            target: "conduit::txn",
                            txn_id = %txn_id,
                            resource = %started.resource_kind(),
                            error = %abort_err,
                            "Abort after failed begin failed"
                        );
                    }
                }
                return Err(e);
            }
            begun.push(resource);
        }

        ctx.attach(txn)?;
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
        debug!(target: "conduit::txn", txn_id = %txn_id, "Transaction started");
        Ok(txn_id)
    }

    /// Commit the active transaction on `ctx`
    ///
    /// # Errors
    ///
    /// `NonExistentTransaction` if `ctx` has no active transaction, or
    /// `TransactionalResource` naming the first resource that failed. On
    /// failure the transaction remains attached to `ctx`.
    pub fn commit(&self, ctx: &mut OperationContext) -> Result<Transaction> {
        let txn_id = ctx.active_transaction()?;

        for resource in self.in_order(ResourceKind::COMMIT_ORDER) {
            let kind = resource.resource_kind();
            if let Err(e) = resource.commit(txn_id) {
                self.commit_failures.fetch_add(1, Ordering::Relaxed);
                let e = match e {
                    ConduitError::Resource(source) => ConduitError::TransactionalResource {
                        resource: kind,
                        source,
                    },
                    other => other,
                };
                warn!(
                    target: "conduit::txn",
                    txn_id = %txn_id,
                    resource = %kind,
                    error = %e,
                    "Commit failed"
                );
                return Err(e);
            }
            debug!(
                target: "conduit::txn",
                txn_id = %txn_id,
                resource = %kind,
                "Resource committed"
            );
        }

        let txn = ctx.finish(TransactionStatus::Committed)?;
        self.record_end(&self.total_committed);
        info!(target: "conduit::txn", txn_id = %txn_id, "Transaction committed");
        Ok(txn)
    }

    /// Abort the active transaction on `ctx`
    ///
    /// Every configured resource is given an abort attempt. Failures are
    /// logged and collected in the report, never returned.
    ///
    /// # Errors
    ///
    /// `NonExistentTransaction` if `ctx` has no active transaction.
    pub fn abort(&self, ctx: &mut OperationContext) -> Result<AbortReport> {
        let txn_id = ctx.active_transaction()?;

        let mut failures = Vec::new();
        for resource in self.in_order(ResourceKind::COMMIT_ORDER) {
            let kind = resource.resource_kind();
            if let Err(e) = resource.abort(txn_id) {
                warn!(
                    target: "conduit::txn",
                    txn_id = %txn_id,
                    resource = %kind,
                    error = %e,
                    "Abort failed, continuing with remaining resources"
                );
                failures.push((kind, e.to_string()));
            }
        }

        let transaction = ctx.finish(TransactionStatus::Aborted)?;
        self.record_end(&self.total_aborted);
        info!(
            target: "conduit::txn",
            txn_id = %txn_id,
            failed_resources = failures.len(),
            "Transaction aborted"
        );
        Ok(AbortReport {
            transaction,
            failures,
        })
    }

    /// Run `f` inside a transaction
    ///
    /// Begins on `ctx`, runs `f`, and commits if it succeeds. If `f` or the
    /// commit fails, the transaction is aborted and the original error is
    /// returned.
    pub fn transaction<F, T>(&self, ctx: &mut OperationContext, f: F) -> Result<T>
    where
        F: FnOnce(&mut OperationContext) -> Result<T>,
    {
        self.begin(ctx)?;
        let outcome = f(ctx).and_then(|value| self.commit(ctx).map(|_| value));
        if outcome.is_err() && ctx.in_transaction() {
            self.abort(ctx)?;
        }
        outcome
    }

    fn record_end(&self, counter: &AtomicU64) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the coordinator metrics
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            active: self.active_count.load(Ordering::Relaxed),
            started: self.total_started.load(Ordering::Relaxed),
            committed: self.total_committed.load(Ordering::Relaxed),
            aborted: self.total_aborted.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
        }
    }
}
