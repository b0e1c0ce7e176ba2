//! Pausable simulation clock.
//!
//! Stands in for the engine's global time scale: `1.0` while the world
//! runs, `0.0` while the challenge holds it paused. The challenge's own
//! timers never consult it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

use crate::challenge::SimulationClock;

/// Atomic run/pause flag with call counters.
#[derive(Debug, Default)]
pub struct PauseClock {
    paused: AtomicBool,
    pauses: AtomicU64,
    resumes: AtomicU64,
}

impl PauseClock {
    /// Creates a running clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time scale the rest of the world should apply.
    #[must_use]
    pub fn time_scale(&self) -> f32 {
        if self.is_paused() { 0.0 } else { 1.0 }
    }

    /// Number of `pause` calls so far.
    #[must_use]
    pub fn pause_count(&self) -> u64 {
        self.pauses.load(Ordering::SeqCst)
    }

    /// Number of `resume` calls so far, redundant ones included.
    #[must_use]
    pub fn resume_count(&self) -> u64 {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl SimulationClock for PauseClock {
    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        if !self.paused.swap(true, Ordering::SeqCst) {
            debug!("simulation clock paused");
        }
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        if self.paused.swap(false, Ordering::SeqCst) {
            debug!("simulation clock resumed");
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
