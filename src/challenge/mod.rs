//! Pattern-memory challenge
//!
//! A master pattern is revealed one growing prefix per round; the player
//! repeats each prefix, the first wrong symbol fails the run, and
//! finishing the last round releases the barrier.

pub mod collaborators;
pub mod engine;
pub mod pattern;
pub mod state;
pub mod trigger;

pub use collaborators::{
    BarrierRelease, ChallengeDisplay, Collaborators, LevelReset, SimulationClock,
};
pub use engine::{PatternChallenge, PatternChallengeBuilder, StartOutcome};
pub use pattern::{MasterPattern, PatternSource, RandomPatterns, ScriptedPatterns, Symbol, SymbolRange};
pub use state::{ChallengePhase, ChallengeSnapshot, ChallengeState, InputOutcome};
pub use trigger::{ChallengeTrigger, TriggerOutcome};
