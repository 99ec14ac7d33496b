//! Fetch-cycle generation counter
//!
//! Every `load` call bumps the counter and captures its own epoch; a
//! resolved fetch cycle may touch shared state only if its epoch is
//! still current. Correctness of cancellation rests on this comparison,
//! not on in-flight requests actually stopping.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing generation counter for fetch cycles
#[derive(Debug, Default)]
pub struct RequestEpoch {
    counter: AtomicU64,
}

impl RequestEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch cycle and return its epoch.
    pub fn bump(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Epoch of the most recently started cycle.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// True if `epoch` belongs to the most recently started cycle.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }
}
