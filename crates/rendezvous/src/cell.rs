//! Single-use rendezvous cell
//!
//! A cell moves through `Unset → Set → Consumed` exactly once. The state is
//! an atomic so the Unset→Set transition is won by a single compare-and-swap;
//! the outcome itself lives behind a mutex paired with a condvar the poller
//! waits on.
//!
//! Results may be staged before they are published: `stage` fills the slot
//! while the cell stays Unset, and `signal` performs the transition. `offer`
//! does both at once.

use crate::clock::Clock;
use conduit_core::{CellId, ConduitError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

const UNSET: u8 = 0;
const SET: u8 = 1;
const CONSUMED: u8 = 2;

/// Observable state of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// No outcome published yet
    Unset,
    /// Outcome published, not yet read
    Set,
    /// Outcome read by the poller
    Consumed,
}

pub(crate) struct Cell<T> {
    id: CellId,
    state: AtomicU8,
    slot: Mutex<Option<Result<T>>>,
    ready: Condvar,
}

impl<T> Cell<T> {
    pub(crate) fn new(id: CellId) -> Self {
        Self {
            id,
            state: AtomicU8::new(UNSET),
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> CellState {
        match self.state.load(Ordering::Acquire) {
            UNSET => CellState::Unset,
            SET => CellState::Set,
            _ => CellState::Consumed,
        }
    }

    /// Fill the slot without publishing; first write wins
    pub(crate) fn stage(&self, outcome: Result<T>) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() || self.state() != CellState::Unset {
            return false;
        }
        *slot = Some(outcome);
        true
    }

    /// Publish a staged outcome
    ///
    /// Returns `false` if the cell was already published.
    pub(crate) fn signal(&self) -> Result<bool> {
        let slot = self.slot.lock();
        if self.state() != CellState::Unset {
            return Ok(false);
        }
        if slot.is_none() {
            return Err(ConduitError::protocol(format!(
                "continuation {} signalled before a result was set",
                self.id
            )));
        }
        Ok(self.publish())
    }

    /// Stage and publish in one step; later offers are no-ops
    pub(crate) fn offer(&self, outcome: Result<T>) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() || self.state() != CellState::Unset {
            return false;
        }
        *slot = Some(outcome);
        self.publish()
    }

    // Caller holds the slot lock so a waiting poller cannot miss the notify.
    fn publish(&self) -> bool {
        let won = self
            .state
            .compare_exchange(UNSET, SET, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.ready.notify_all();
        }
        won
    }

    /// Block until the outcome is published or `timeout` elapses on `clock`
    ///
    /// A timeout too large to represent as an `Instant` waits without a
    /// deadline.
    pub(crate) fn poll(&self, clock: &dyn Clock, timeout: Duration) -> Result<T> {
        let deadline = clock.now().checked_add(timeout);
        let mut slot = self.slot.lock();
        loop {
            match self.state() {
                CellState::Set => {
                    if let Some(outcome) = slot.take() {
                        self.state.store(CONSUMED, Ordering::Release);
                        return outcome;
                    }
                }
                CellState::Consumed => {
                    return Err(ConduitError::protocol(format!(
                        "cell {} was already consumed",
                        self.id
                    )));
                }
                CellState::Unset => {}
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = clock.now();
                    if now >= deadline {
                        return Err(ConduitError::Timeout {
                            cell: self.id,
                            waited: timeout,
                        });
                    }
                    (deadline - now).min(clock.wait_slice())
                }
                None => clock.wait_slice(),
            };
            self.ready.wait_for(&mut slot, wait);
        }
    }
}
