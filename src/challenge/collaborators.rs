//! Interfaces the challenge drives but does not own.
//!
//! Every call is fire-and-forget: the engine never waits on rendering or
//! on a sink finishing its work. Implementations must not call back into
//! the challenge synchronously from these methods.

use std::sync::Arc;

use super::pattern::Symbol;

/// Renders the challenge to the player.
pub trait ChallengeDisplay: Send + Sync {
    /// Makes the challenge overlay visible.
    fn show(&self);

    /// Hides the overlay and clears anything it was showing.
    fn hide(&self);

    /// Shows the pattern prefix for `round` of `total_rounds`.
    fn show_pattern(&self, symbols: &[Symbol], round: u32, total_rounds: u32);

    /// Replaces the pattern with `round` empty input slots.
    fn show_input_slots(&self, round: u32);

    /// Fills slot `position` (1-indexed) with `symbol`.
    fn show_input_feedback(&self, symbol: Symbol, correct: bool, position: usize);

    /// Announces a completed round.
    fn show_round_complete(&self);

    /// Announces that the whole challenge was completed.
    fn show_success(&self);

    /// Announces that the challenge was failed.
    fn show_failure(&self);
}

/// Side effect fired once when a run succeeds.
pub trait BarrierRelease: Send + Sync {
    /// Drops the barrier guarded by the challenge.
    fn release_barrier(&self);
}

/// Side effect fired once when a run fails.
pub trait LevelReset: Send + Sync {
    /// Restores all persistent world state to the last hard checkpoint.
    fn hard_reset(&self);
}

/// World-wide pause switch held by the challenge while it runs.
///
/// `resume` must tolerate being called when the clock is already running.
pub trait SimulationClock: Send + Sync {
    /// Stops simulation time.
    fn pause(&self);

    /// Restarts simulation time.
    fn resume(&self);

    /// Whether simulation time is currently stopped.
    fn is_paused(&self) -> bool;
}

/// The set of collaborators injected into a challenge.
///
/// Display and sinks are optional: a missing one is reported at the
/// moment it would have been used and the run carries on without it.
#[derive(Clone)]
pub struct Collaborators {
    /// Overlay renderer.
    pub display: Option<Arc<dyn ChallengeDisplay>>,
    /// Success sink.
    pub barrier: Option<Arc<dyn BarrierRelease>>,
    /// Failure sink.
    pub level_reset: Option<Arc<dyn LevelReset>>,
    /// Pause switch.
    pub clock: Arc<dyn SimulationClock>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("display", &self.display.is_some())
            .field("barrier", &self.barrier.is_some())
            .field("level_reset", &self.level_reset.is_some())
            .field("clock_paused", &self.clock.is_paused())
            .finish()
    }
}
