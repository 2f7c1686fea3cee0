//! Rendezvous for deferred results
//!
//! Lets a worker thread block on a result that another thread, possibly in
//! another instance, supplies later:
//!
//! - [`ContinuationRegistry`]: in-process continuations tracked on the
//!   [`OperationContext`](conduit_core::OperationContext)
//! - [`PendingResultRegistry`]: results routed between instances through a
//!   [`BroadcastChannel`](conduit_resources::BroadcastChannel)
//!
//! Every cell is single-use: one offer is applied, one poll consumes it.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cell;
pub mod clock;
pub mod continuation;
pub mod offer;
pub mod pending;

pub use cell::CellState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use continuation::{ContinuationRegistry, DEFAULT_CONTINUATION_TIMEOUT};
pub use offer::{OfferOutcome, PendingId, ResultOffer};
pub use pending::{PendingResultRegistry, DEFAULT_PENDING_RESULT_TIMEOUT};
