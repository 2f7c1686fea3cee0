//! Time source for poll deadlines

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Source of the current instant used to compute poll deadlines
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Longest real-time wait between deadline checks
    ///
    /// Clocks that do not follow real time return a short slice so a waiting
    /// poller notices when the clock is moved past its deadline.
    fn wait_slice(&self) -> Duration {
        Duration::MAX
    }
}

/// The system monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    const SLICE: Duration = Duration::from_millis(5);

    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Total time the clock has been advanced
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn wait_slice(&self) -> Duration {
        Self::SLICE
    }
}
