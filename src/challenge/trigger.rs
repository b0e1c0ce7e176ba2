//! The enemy that starts the challenge when shot.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::world::Resettable;

use super::engine::{PatternChallenge, StartOutcome};
use super::state::ChallengePhase;

/// What a hit on the trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The hit started a new run.
    Started {
        /// Identifier of the new run.
        run_id: u64,
    },
    /// The trigger already fired and repeats are disabled.
    AlreadyActivated,
    /// The challenge was busy with another run; the hit is spent anyway.
    Busy {
        /// Phase of the run in progress.
        phase: ChallengePhase,
    },
}

/// Challenge-starting enemy.
///
/// The trigger marks itself activated before asking the challenge to
/// start, so a hit that lands while the challenge is busy still uses up
/// a non-repeating trigger. [`reset`](Self::reset) re-arms it.
#[derive(Debug)]
pub struct ChallengeTrigger {
    challenge: PatternChallenge,
    allow_repeat: bool,
    activated: AtomicBool,
}

impl ChallengeTrigger {
    /// Creates an armed trigger for `challenge`.
    #[must_use]
    pub const fn new(challenge: PatternChallenge, allow_repeat: bool) -> Self {
        Self {
            challenge,
            allow_repeat,
            activated: AtomicBool::new(false),
        }
    }

    /// Handles a projectile hit.
    pub fn on_shot_hit(&self) -> TriggerOutcome {
        let was_activated = self.activated.swap(true, Ordering::SeqCst);
        if was_activated && !self.allow_repeat {
            debug!("trigger already activated; hit ignored");
            return TriggerOutcome::AlreadyActivated;
        }

        match self.challenge.start_challenge() {
            StartOutcome::Started { run_id } => {
                info!(run_id, "trigger hit; challenge started");
                TriggerOutcome::Started { run_id }
            }
            StartOutcome::Rejected { phase, .. } => TriggerOutcome::Busy { phase },
        }
    }

    /// Whether the trigger has fired since it was last armed.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    /// Re-arms the trigger.
    pub fn reset(&self) {
        if self.activated.swap(false, Ordering::SeqCst) {
            debug!("trigger re-armed");
        }
    }
}

impl Resettable for ChallengeTrigger {
    fn reset(&self) {
        Self::reset(self);
    }
}
