//! Cross-instance pending results
//!
//! A [`PendingResultRegistry`] hands out [`PendingId`]s that name the
//! instance owning the cell. Whoever produces the result offers it through
//! any registry connected to the same broadcast channel: offers for the
//! local instance complete the cell directly, offers for another instance are
//! encoded with MessagePack and published as a [`ResultOffer`]. Each registry
//! subscribes to the channel and applies only the offers addressed to cells
//! it holds.

use crate::cell::{Cell, CellState};
use crate::clock::{Clock, SystemClock};
use crate::offer::{aborted, OfferOutcome, PendingId, ResultOffer};
use conduit_core::{CellId, Classify, ConduitError, ErrorKind, InstanceId, Result};
use conduit_resources::{BroadcastChannel, SubscriptionId};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default time a pending result waits for its offer
pub const DEFAULT_PENDING_RESULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry of pending results owned by this instance
pub struct PendingResultRegistry<T> {
    instance: InstanceId,
    cells: DashMap<CellId, Arc<Cell<T>>>,
    channel: Arc<dyn BroadcastChannel<ResultOffer>>,
    subscription: SubscriptionId,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl<T> Drop for PendingResultRegistry<T> {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.subscription);
        trace!(
            target: "conduit::rendezvous",
            instance = %self.instance,
            "Pending-result registry unsubscribed"
        );
    }
}

impl<T> PendingResultRegistry<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Connect a registry with a fresh instance id on the system clock
    pub fn new(channel: Arc<dyn BroadcastChannel<ResultOffer>>) -> Arc<Self> {
        Self::connect(
            InstanceId::new(),
            channel,
            Arc::new(SystemClock),
            DEFAULT_PENDING_RESULT_TIMEOUT,
        )
    }

    /// Connect a registry and subscribe it to `channel`
    ///
    /// The subscription holds only a weak reference and is removed from the
    /// channel when the registry is dropped.
    pub fn connect(
        instance: InstanceId,
        channel: Arc<dyn BroadcastChannel<ResultOffer>>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Arc<Self> {
        let registry = Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = channel.subscribe(Arc::new(move |offer: &ResultOffer| {
                if let Some(registry) = weak.upgrade() {
                    registry.receive(offer);
                }
            }));
            Self {
                instance,
                cells: DashMap::new(),
                channel: Arc::clone(&channel),
                subscription,
                clock,
                timeout,
            }
        });
        debug!(
            target: "conduit::rendezvous",
            instance = %instance,
            "Pending-result registry connected"
        );
        registry
    }

    /// This instance's id
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Poll timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Allocate a pending result owned by this instance
    pub fn create(&self) -> PendingId {
        let cell = CellId::new();
        self.cells.insert(cell, Arc::new(Cell::new(cell)));
        let id = PendingId {
            instance: self.instance,
            cell,
        };
        debug!(target: "conduit::rendezvous", pending = %id, "Pending result created");
        id
    }

    /// Drop a local pending result, failing any poller waiting on it
    ///
    /// Returns `false` if the cell was not held here.
    pub fn remove(&self, id: PendingId) -> bool {
        if id.instance != self.instance {
            return false;
        }
        match self.cells.remove(&id.cell) {
            Some((_, cell)) => {
                cell.offer(Err(aborted(id)));
                debug!(target: "conduit::rendezvous", pending = %id, "Pending result removed");
                true
            }
            None => false,
        }
    }

    /// State of a local pending result
    pub fn state(&self, id: PendingId) -> Option<CellState> {
        if id.instance != self.instance {
            return None;
        }
        self.cells.get(&id.cell).map(|cell| cell.state())
    }

    /// Block until the pending result is offered
    ///
    /// The cell is removed whether the poll succeeds, fails or times out.
    ///
    /// # Errors
    ///
    /// `Protocol` if the id belongs to another instance or is no longer held
    /// (including a second poll), `Timeout` if nothing was offered in time, or
    /// the failure the producer offered.
    pub fn poll(&self, id: PendingId) -> Result<T> {
        if id.instance != self.instance {
            return Err(ConduitError::protocol(format!(
                "pending result {} is owned by another instance",
                id
            )));
        }
        let cell = self
            .cells
            .get(&id.cell)
            .map(|cell| Arc::clone(cell.value()))
            .ok_or_else(|| ConduitError::protocol(format!("unknown pending result {}", id)))?;
        let outcome = cell.poll(self.clock.as_ref(), self.timeout);
        self.cells.remove(&id.cell);
        if let Err(ConduitError::Timeout { .. }) = &outcome {
            warn!(target: "conduit::rendezvous", pending = %id, "Pending result timed out");
        }
        outcome
    }

    /// Offer a value; repeated offers are no-ops
    ///
    /// # Errors
    ///
    /// `Protocol` if the value cannot be encoded, or the channel's failure
    /// when publishing to another instance.
    pub fn offer(&self, id: PendingId, value: T) -> Result<()> {
        if id.instance == self.instance {
            self.apply_local(id, Ok(value));
            return Ok(());
        }
        let bytes = rmp_serde::to_vec(&value).map_err(|e| {
            ConduitError::protocol(format!("cannot encode result for {}: {}", id, e))
        })?;
        self.publish(id, OfferOutcome::Value(bytes))
    }

    /// Offer a failure; the poller receives it as its error
    ///
    /// A local poller gets `error` itself. A poller on another instance gets
    /// an `OperationFailed` carrying the same message and the same
    /// [`ErrorKind`], so both see one class.
    pub fn offer_error(&self, id: PendingId, error: ConduitError) -> Result<()> {
        if id.instance == self.instance {
            self.apply_local(id, Err(error));
            return Ok(());
        }
        let kind = error.kind().to_string();
        let message = match error {
            ConduitError::OperationFailed { message, .. } => message,
            other => other.to_string(),
        };
        self.publish(id, OfferOutcome::Failed { kind, message })
    }

    /// Tell the owner no offer is coming so its poller fails immediately
    pub fn abort_offer(&self, id: PendingId) -> Result<()> {
        if id.instance == self.instance {
            self.apply_local(id, Err(aborted(id)));
            return Ok(());
        }
        self.publish(id, OfferOutcome::Aborted)
    }

    fn publish(&self, id: PendingId, outcome: OfferOutcome) -> Result<()> {
        trace!(target: "conduit::rendezvous", pending = %id, "Publishing offer");
        self.channel.publish(ResultOffer {
            target: id.instance,
            cell: id.cell,
            outcome,
        })?;
        Ok(())
    }

    fn apply_local(&self, id: PendingId, outcome: Result<T>) {
        let cell = self.cells.get(&id.cell).map(|cell| Arc::clone(cell.value()));
        match cell {
            Some(cell) => {
                if !cell.offer(outcome) {
                    debug!(target: "conduit::rendezvous", pending = %id, "Ignoring repeated offer");
                }
            }
            None => debug!(
                target: "conduit::rendezvous",
                pending = %id,
                "Offer for unknown cell ignored"
            ),
        }
    }

    fn receive(&self, offer: &ResultOffer) {
        if offer.target != self.instance {
            return;
        }
        let id = offer.pending_id();
        let outcome = match &offer.outcome {
            OfferOutcome::Value(bytes) => rmp_serde::from_slice::<T>(bytes).map_err(|e| {
                ConduitError::protocol(format!("cannot decode result for {}: {}", id, e))
            }),
            OfferOutcome::Failed { kind, message } => Err(ConduitError::operation_failed_as(
                ErrorKind::from_name(kind),
                message.clone(),
            )),
            OfferOutcome::Aborted => Err(aborted(id)),
        };
        self.apply_local(id, outcome);
    }

    /// Number of live pending results
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no pending result is live
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
