//! Offer events exchanged between instances

use conduit_core::{CellId, ConduitError, InstanceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a pending result: the owning instance and its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingId {
    /// Instance that created the cell and will poll it
    pub instance: InstanceId,
    /// The cell within that instance
    pub cell: CellId,
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance, self.cell)
    }
}

/// Outcome carried by a [`ResultOffer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferOutcome {
    /// MessagePack-encoded value
    Value(Vec<u8>),
    /// The producer failed
    Failed {
        /// [`ErrorKind`](conduit_core::ErrorKind) name of the failure
        kind: String,
        /// Description of the failure
        message: String,
    },
    /// The producer gave up before producing anything
    Aborted,
}

/// A result published for the instance that owns the target cell
///
/// Every instance receives every offer; only the owner of `cell` applies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOffer {
    /// Instance that owns the cell
    pub target: InstanceId,
    /// Cell to complete
    pub cell: CellId,
    /// What to complete it with
    pub outcome: OfferOutcome,
}

impl ResultOffer {
    /// Address this offer is for
    pub fn pending_id(&self) -> PendingId {
        PendingId {
            instance: self.target,
            cell: self.cell,
        }
    }
}

pub(crate) fn aborted(id: PendingId) -> ConduitError {
    ConduitError::operation_failed(format!(
        "pending result {} was abandoned before an offer was made",
        id
    ))
}
