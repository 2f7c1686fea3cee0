//! In-process continuations
//!
//! A deferring operation calls [`ContinuationRegistry::create`], which records
//! the new cell on its [`OperationContext`], hands the id to whoever will
//! complete the work, and then blocks in [`ContinuationRegistry::poll`]. The
//! completing thread supplies the outcome with `offer`, or in two steps with
//! `set_result` followed by `signal_complete`.

use crate::cell::{Cell, CellState};
use crate::clock::{Clock, SystemClock};
use conduit_core::{CellId, ConduitError, OperationContext, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time a continuation waits for its result
pub const DEFAULT_CONTINUATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Registry of in-process continuations
pub struct ContinuationRegistry<T> {
    cells: DashMap<CellId, Arc<Cell<T>>>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl<T: Send> ContinuationRegistry<T> {
    /// Create a registry on the system clock with the default timeout
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a registry on `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            cells: DashMap::new(),
            clock,
            timeout: DEFAULT_CONTINUATION_TIMEOUT,
        }
    }

    /// Replace the poll timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Allocate a continuation and record it on `ctx`
    ///
    /// # Errors
    ///
    /// `Protocol` if `ctx` is already deferred on a continuation.
    pub fn create(&self, ctx: &mut OperationContext) -> Result<CellId> {
        let id = CellId::new();
        ctx.set_continuation(id)?;
        self.cells.insert(id, Arc::new(Cell::new(id)));
        debug!(target: "conduit::rendezvous", cell = %id, "Continuation created");
        Ok(id)
    }

    /// Id of the continuation `ctx` is deferred on
    ///
    /// # Errors
    ///
    /// `Protocol` if `ctx` is not deferred.
    pub fn current_id(&self, ctx: &OperationContext) -> Result<CellId> {
        ctx.continuation()
            .ok_or_else(|| ConduitError::protocol("operation is not deferred on a continuation"))
    }

    fn cell(&self, id: CellId) -> Result<Arc<Cell<T>>> {
        self.cells
            .get(&id)
            .map(|cell| Arc::clone(cell.value()))
            .ok_or_else(|| ConduitError::protocol(format!("unknown continuation {}", id)))
    }

    /// Store the outcome without waking the poller
    ///
    /// Returns `false` if an outcome was already stored. Call
    /// [`signal_complete`](Self::signal_complete) to publish it.
    pub fn set_result(&self, id: CellId, outcome: Result<T>) -> Result<bool> {
        Ok(self.cell(id)?.stage(outcome))
    }

    /// Publish the stored outcome and wake the poller
    ///
    /// Returns `false` if the continuation was already completed.
    ///
    /// # Errors
    ///
    /// `Protocol` if the id is unknown or no result was set.
    pub fn signal_complete(&self, id: CellId) -> Result<bool> {
        self.cell(id)?.signal()
    }

    /// Store and publish the outcome; later offers are no-ops
    pub fn offer(&self, id: CellId, outcome: Result<T>) -> Result<bool> {
        let applied = self.cell(id)?.offer(outcome);
        if !applied {
            debug!(target: "conduit::rendezvous", cell = %id, "Ignoring repeated offer");
        }
        Ok(applied)
    }

    /// State of a live continuation
    pub fn state(&self, id: CellId) -> Option<CellState> {
        self.cells.get(&id).map(|cell| cell.state())
    }

    /// Block until the continuation `ctx` is deferred on completes
    ///
    /// The continuation is cleared from `ctx` and removed from the registry
    /// whether the poll succeeds, fails or times out.
    ///
    /// # Errors
    ///
    /// `Protocol` if `ctx` is not deferred, `Timeout` if no outcome arrived in
    /// time, or the failure the completing side supplied.
    pub fn poll(&self, ctx: &mut OperationContext) -> Result<T> {
        let id = ctx
            .take_continuation()
            .ok_or_else(|| ConduitError::protocol("operation is not deferred on a continuation"))?;
        let cell = self.cell(id)?;
        let outcome = cell.poll(self.clock.as_ref(), self.timeout);
        self.cells.remove(&id);
        if let Err(ConduitError::Timeout { waited, .. }) = &outcome {
            warn!(
                target: "conduit::rendezvous",
                cell = %id,
                waited_ms = waited.as_millis() as u64,
                "Continuation timed out"
            );
        }
        outcome
    }

    /// Number of live continuations
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no continuation is live
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<T: Send> Default for ContinuationRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
