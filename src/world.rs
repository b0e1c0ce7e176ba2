//! In-memory world the challenge acts on.
//!
//! [`ShieldBarrier`] is the success sink and [`CheckpointLedger`] the
//! failure sink used by the `play` command. Both are deliberately small:
//! they record what happened so a session (or a test) can read it back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::challenge::{BarrierRelease, LevelReset};

/// World object restored by a hard reset.
pub trait Resettable: Send + Sync {
    /// Returns the object to its initial state.
    fn reset(&self);
}

// ============================================================================
// Shield barrier
// ============================================================================

#[derive(Debug, Default)]
struct BarrierState {
    linked: usize,
    remaining: usize,
    released: bool,
}

/// A barrier held up by its linked enemies.
///
/// It drops when the last linked enemy is destroyed or when released
/// from outside. Releasing an already-dropped barrier does nothing.
#[derive(Debug, Default)]
pub struct ShieldBarrier {
    state: Mutex<BarrierState>,
    releases: AtomicU64,
}

impl ShieldBarrier {
    /// Creates a raised barrier with no linked enemies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a raised barrier held by `enemies` linked enemies.
    #[must_use]
    pub fn with_linked_enemies(enemies: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                linked: enemies,
                remaining: enemies,
                released: false,
            }),
            releases: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the destruction of one linked enemy.
    ///
    /// The barrier drops when none remain.
    pub fn notify_enemy_destroyed(&self) {
        let mut state = self.state();
        state.remaining = state.remaining.saturating_sub(1);
        debug!(remaining = state.remaining, "linked enemy destroyed");
        if state.remaining == 0 {
            self.drop_barrier(&mut state);
        }
    }

    /// Drops the barrier on behalf of an external system.
    pub fn release(&self) {
        let mut state = self.state();
        self.drop_barrier(&mut state);
    }

    fn drop_barrier(&self, state: &mut BarrierState) {
        if state.released {
            debug!("barrier already released");
            return;
        }
        state.released = true;
        self.releases.fetch_add(1, Ordering::SeqCst);
        info!("barrier released");
    }

    /// Whether the barrier is down.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state().released
    }

    /// Linked enemies still standing.
    #[must_use]
    pub fn remaining_enemies(&self) -> usize {
        self.state().remaining
    }

    /// How many times the barrier actually dropped.
    #[must_use]
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    /// Raises the barrier and restores every linked enemy.
    pub fn rearm(&self) {
        let mut state = self.state();
        state.remaining = state.linked;
        state.released = false;
        debug!(linked = state.linked, "barrier raised");
    }
}

impl BarrierRelease for ShieldBarrier {
    fn release_barrier(&self) {
        self.release();
    }
}

impl Resettable for ShieldBarrier {
    fn reset(&self) {
        self.rearm();
    }
}

// ============================================================================
// Checkpoint ledger
// ============================================================================

struct LedgerState {
    initial: String,
    current: String,
    resets: u64,
    registered: Vec<Arc<dyn Resettable>>,
}

/// Tracks the player's checkpoint and performs hard resets.
///
/// A hard reset sends the player back to the initial checkpoint, forgets
/// any checkpoint reached since, and resets every registered object.
pub struct CheckpointLedger {
    state: Mutex<LedgerState>,
}

impl std::fmt::Debug for CheckpointLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("CheckpointLedger")
            .field("initial", &state.initial)
            .field("current", &state.current)
            .field("resets", &state.resets)
            .field("registered", &state.registered.len())
            .finish()
    }
}

impl CheckpointLedger {
    /// Creates a ledger positioned at `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            state: Mutex::new(LedgerState {
                current: initial.clone(),
                initial,
                resets: 0,
                registered: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a newly reached checkpoint.
    pub fn set_checkpoint(&self, label: impl Into<String>) {
        let label = label.into();
        debug!(checkpoint = %label, "checkpoint reached");
        self.state().current = label;
    }

    /// The checkpoint a respawn would use.
    #[must_use]
    pub fn current(&self) -> String {
        self.state().current.clone()
    }

    /// The level's starting checkpoint.
    #[must_use]
    pub fn initial(&self) -> String {
        self.state().initial.clone()
    }

    /// Number of hard resets so far.
    #[must_use]
    pub fn reset_count(&self) -> u64 {
        self.state().resets
    }

    /// Adds an object to be reset by every hard reset.
    pub fn register(&self, object: Arc<dyn Resettable>) {
        self.state().registered.push(object);
    }
}

impl LevelReset for CheckpointLedger {
    fn hard_reset(&self) {
        let registered = {
            let mut state = self.state();
            state.current = state.initial.clone();
            state.resets += 1;
            info!(
                checkpoint = %state.initial,
                resets = state.resets,
                "hard reset to initial checkpoint"
            );
            state.registered.clone()
        };
        for object in registered {
            object.reset();
        }
    }
}
