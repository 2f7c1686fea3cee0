//! Retry Integration Tests
//!
//! Bounded retry, fail-immediately classes, the retry switch and handler
//! dispatch, driven through a recording sleeper.

#[path = "../common/mod.rs"]
mod common;


use conduit::Sleeper;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Sleeper that records each requested pause instead of sleeping
#[derive(Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.pauses.lock().push(duration);
    }
}
