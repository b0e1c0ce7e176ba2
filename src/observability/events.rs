//! Structured event stream.
//!
//! Discrete, typed events emitted as a challenge runs. Events are
//! serialized as newline-delimited JSON (JSONL) with a monotonically
//! increasing sequence number for ordering.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::challenge::{ChallengePhase, Symbol};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a challenge session.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A run started and the world was paused.
    ChallengeStarted {
        /// When the run started.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Rounds in this run.
        total_rounds: u32,
    },

    /// A start request arrived while a run was in progress.
    ChallengeRejected {
        /// When the request was rejected.
        timestamp: DateTime<Utc>,
        /// Phase of the run that blocked it.
        phase: ChallengePhase,
        /// Round of the run that blocked it.
        round: u32,
    },

    /// A round's pattern prefix went on screen.
    RoundStarted {
        /// When the reveal began.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Round number, 1-indexed.
        round: u32,
    },

    /// A correct symbol was entered.
    InputAccepted {
        /// When the symbol arrived.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Round number.
        round: u32,
        /// 1-indexed slot.
        position: usize,
        /// The symbol.
        symbol: Symbol,
    },

    /// A wrong symbol was entered.
    InputMismatch {
        /// When the symbol arrived.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Round number.
        round: u32,
        /// 1-indexed slot.
        position: usize,
        /// Symbol the pattern required.
        expected: Symbol,
        /// Symbol that was entered.
        received: Symbol,
    },

    /// A round was repeated correctly.
    RoundCompleted {
        /// When the last symbol arrived.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Round number.
        round: u32,
    },

    /// The run ended in success and the barrier was released.
    ChallengeSucceeded {
        /// When the side effect fired.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Wall-clock duration of the run in milliseconds.
        duration_ms: u64,
    },

    /// The run ended in failure and the level was reset.
    ChallengeFailed {
        /// When the side effect fired.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Round in which the mismatch happened.
        round: u32,
        /// Wall-clock duration of the run in milliseconds.
        duration_ms: u64,
    },

    /// The run was cancelled without side effects.
    ChallengeCancelled {
        /// When the cancellation happened.
        timestamp: DateTime<Utc>,
        /// Run identifier.
        run_id: u64,
        /// Phase the run was in.
        phase: ChallengePhase,
    },

    /// End-of-session totals.
    SessionSummary {
        /// When the session ended.
        timestamp: DateTime<Utc>,
        /// Aggregated counts.
        #[serde(flatten)]
        summary: SessionSummary,
    },
}

/// Counters for a hosted session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Runs started.
    pub runs: u64,
    /// Runs that released the barrier.
    pub succeeded: u64,
    /// Runs that reset the level.
    pub failed: u64,
    /// Runs cancelled before an outcome.
    pub cancelled: u64,
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are silently dropped: observability
/// must never interrupt a running challenge.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
