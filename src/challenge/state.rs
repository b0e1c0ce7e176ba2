//! Round state and input verification.
//!
//! [`ChallengeState`] is the synchronous heart of a run: it knows the
//! master pattern, the current round and what the player has typed, and
//! decides the fate of each submitted symbol. Timing and collaborator
//! calls live in the engine.

use serde::Serialize;

use super::pattern::{MasterPattern, Symbol, SymbolRange};

/// Lifecycle phase of the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePhase {
    /// No run in progress.
    #[default]
    Idle,
    /// The current prefix is on screen; input is ignored.
    DisplayingPattern,
    /// Waiting for the player to repeat the prefix.
    AwaitingInput,
    /// Round finished correctly; grace interval before the next reveal.
    RoundComplete,
    /// Final round finished correctly; settling before barrier release.
    Succeeded,
    /// A wrong symbol was entered; settling before the level reset.
    Failed,
}

impl ChallengePhase {
    /// Whether a run occupying the challenge is in progress.
    ///
    /// `Succeeded` and `Failed` are settling, not active: a new run may
    /// start while they wait out their delay.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::DisplayingPattern | Self::AwaitingInput | Self::RoundComplete
        )
    }

    /// Whether the phase is a terminal outcome.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Stable lowercase name, used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DisplayingPattern => "displaying_pattern",
            Self::AwaitingInput => "awaiting_input",
            Self::RoundComplete => "round_complete",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ChallengePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a submitted symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Not in the input window; nothing changed.
    Ignored {
        /// Phase the challenge was in.
        phase: ChallengePhase,
    },
    /// Symbol outside the configured range; nothing changed.
    OutOfRange {
        /// The rejected symbol.
        symbol: Symbol,
    },
    /// Correct symbol, round not finished yet.
    Accepted {
        /// 1-indexed slot the symbol filled.
        position: usize,
        /// Symbols still needed to finish the round.
        remaining: usize,
    },
    /// Correct symbol that completed the round.
    RoundCompleted {
        /// The round that was completed.
        round: u32,
        /// Whether this was the final round.
        last: bool,
    },
    /// Wrong symbol; the run has failed.
    Mismatch {
        /// 1-indexed slot the symbol was entered into.
        position: usize,
        /// The symbol the pattern required.
        expected: Symbol,
        /// The symbol that was entered.
        received: Symbol,
    },
}

impl InputOutcome {
    /// Whether the symbol was appended to the current input.
    #[must_use]
    pub const fn was_accepted(&self) -> bool {
        matches!(
            self,
            Self::Accepted { .. } | Self::RoundCompleted { .. } | Self::Mismatch { .. }
        )
    }
}

/// Live state of one challenge run.
#[derive(Debug, Clone)]
pub struct ChallengeState {
    run_id: u64,
    pattern: MasterPattern,
    range: SymbolRange,
    current_round: u32,
    current_input: Vec<Symbol>,
    phase: ChallengePhase,
}

impl ChallengeState {
    /// Creates the state for a fresh run, positioned before round 1.
    #[must_use]
    pub const fn new(run_id: u64, pattern: MasterPattern, range: SymbolRange) -> Self {
        Self {
            run_id,
            pattern,
            range,
            current_round: 1,
            current_input: Vec::new(),
            phase: ChallengePhase::Idle,
        }
    }

    /// Identifier of the run this state belongs to.
    #[must_use]
    pub const fn run_id(&self) -> u64 {
        self.run_id
    }

    /// The master pattern for this run.
    #[must_use]
    pub const fn pattern(&self) -> &MasterPattern {
        &self.pattern
    }

    /// Current round, 1-indexed.
    #[must_use]
    pub const fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Symbols entered so far this round.
    #[must_use]
    pub fn current_input(&self) -> &[Symbol] {
        &self.current_input
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ChallengePhase {
        self.phase
    }

    /// Total number of rounds in this run.
    #[must_use]
    pub fn total_rounds(&self) -> u32 {
        u32::try_from(self.pattern.len()).unwrap_or(u32::MAX)
    }

    /// Enters `DisplayingPattern` for `round` and returns the prefix to show.
    pub fn begin_round(&mut self, round: u32) -> &[Symbol] {
        self.current_round = round;
        self.current_input.clear();
        self.phase = ChallengePhase::DisplayingPattern;
        self.pattern.prefix(round)
    }

    /// Enters `AwaitingInput` with an empty input buffer.
    pub fn open_input(&mut self) {
        self.current_input.clear();
        self.phase = ChallengePhase::AwaitingInput;
    }

    /// Checks `symbol` against the pattern and advances the phase.
    ///
    /// The symbol is compared against `pattern[len(input)]` before it
    /// counts; the first mismatch moves straight to `Failed`.
    pub fn accept(&mut self, symbol: Symbol) -> InputOutcome {
        if self.phase != ChallengePhase::AwaitingInput {
            return InputOutcome::Ignored { phase: self.phase };
        }
        if !self.range.contains(symbol) {
            return InputOutcome::OutOfRange { symbol };
        }

        let index = self.current_input.len();
        let Some(expected) = self.pattern.get(index) else {
            return InputOutcome::Ignored { phase: self.phase };
        };
        self.current_input.push(symbol);
        let position = index + 1;

        if symbol != expected {
            self.phase = ChallengePhase::Failed;
            return InputOutcome::Mismatch {
                position,
                expected,
                received: symbol,
            };
        }

        let needed = self.pattern.prefix(self.current_round).len();
        if position < needed {
            return InputOutcome::Accepted {
                position,
                remaining: needed - position,
            };
        }

        let last = self.current_round >= self.total_rounds();
        self.phase = if last {
            ChallengePhase::Succeeded
        } else {
            ChallengePhase::RoundComplete
        };
        InputOutcome::RoundCompleted {
            round: self.current_round,
            last,
        }
    }
}

/// Read-only view of the challenge, published on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChallengeSnapshot {
    /// Identifier of the run, `None` when idle.
    pub run_id: Option<u64>,
    /// Current phase.
    pub phase: ChallengePhase,
    /// Current round (0 when idle).
    pub current_round: u32,
    /// Configured round count.
    pub total_rounds: u32,
    /// Symbols entered this round.
    pub current_input: Vec<Symbol>,
    /// The run's master pattern, empty when idle.
    pub pattern: Vec<Symbol>,
}

impl ChallengeSnapshot {
    /// Snapshot of an idle challenge.
    #[must_use]
    pub fn idle(total_rounds: u32) -> Self {
        Self {
            total_rounds,
            ..Self::default()
        }
    }

    /// Snapshot of a live run.
    #[must_use]
    pub fn of(state: &ChallengeState) -> Self {
        Self {
            run_id: Some(state.run_id),
            phase: state.phase,
            current_round: state.current_round,
            total_rounds: state.total_rounds(),
            current_input: state.current_input.clone(),
            pattern: state.pattern.as_slice().to_vec(),
        }
    }
}
