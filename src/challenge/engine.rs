//! Challenge engine orchestration.
//!
//! [`PatternChallenge`] owns at most one live run. Each run is driven by a
//! background task that paces the reveal, input, grace and settle steps
//! with tokio's wall-clock timers, so pausing the simulation clock never
//! stalls the challenge itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::PauseClock;
use crate::config::{ChallengeConfig, ensure_valid};
use crate::error::ConfigError;
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

use super::collaborators::{
    BarrierRelease, ChallengeDisplay, Collaborators, LevelReset, SimulationClock,
};
use super::pattern::{PatternSource, RandomPatterns, Symbol, SymbolRange};
use super::state::{ChallengePhase, ChallengeSnapshot, ChallengeState, InputOutcome};

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run began.
    Started {
        /// Identifier of the new run.
        run_id: u64,
    },
    /// A run was already in progress; nothing changed.
    Rejected {
        /// Phase of the run in progress.
        phase: ChallengePhase,
        /// Round of the run in progress.
        round: u32,
    },
}

impl StartOutcome {
    /// Whether a new run began.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// Sent by input handling to the driver when a round is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundSignal {
    Completed,
    Failed,
}

struct LiveRun {
    state: ChallengeState,
    cancel: CancellationToken,
    signals: mpsc::UnboundedSender<RoundSignal>,
}

/// A terminal run replaced by a newer one before its settle delay ran out.
struct SettlingRun {
    run_id: u64,
    outcome: ChallengePhase,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Session {
    live: Option<LiveRun>,
    settling: Vec<SettlingRun>,
}

impl Session {
    fn owned_by(&self, run_id: u64) -> bool {
        self.live
            .as_ref()
            .is_some_and(|run| run.state.run_id() == run_id)
    }
}

struct Inner {
    config: ChallengeConfig,
    range: SymbolRange,
    collaborators: Collaborators,
    patterns: Mutex<Box<dyn PatternSource>>,
    session: Mutex<Session>,
    snapshot_tx: watch::Sender<ChallengeSnapshot>,
    next_run_id: AtomicU64,
    events: Option<Arc<EventEmitter>>,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn display(&self) -> Option<&dyn ChallengeDisplay> {
        self.collaborators.display.as_deref()
    }

    fn publish(&self, session: &Session) {
        let snapshot = session.live.as_ref().map_or_else(
            || ChallengeSnapshot::idle(self.config.total_rounds),
            |run| ChallengeSnapshot::of(&run.state),
        );
        self.snapshot_tx.send_replace(snapshot);
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    /// Enters `DisplayingPattern` for `round` and puts its prefix on screen.
    fn reveal(&self, state: &mut ChallengeState, round: u32) {
        let total = state.total_rounds();
        let run_id = state.run_id();
        let prefix = state.begin_round(round);
        debug!(run_id, round, symbols = prefix.len(), "revealing pattern");
        if let Some(display) = self.display() {
            display.show_pattern(prefix, round, total);
        }
        self.emit(Event::RoundStarted {
            timestamp: Utc::now(),
            run_id,
            round,
        });
        metrics::set_current_round(round);
    }
}

/// Pattern-memory challenge.
///
/// Cheap to clone; every clone drives the same challenge. Collaborators
/// are injected through [`PatternChallengeBuilder`].
///
/// At most one run is active at a time. A run that has reached
/// `Succeeded` or `Failed` is settling rather than active, so a new run
/// may start while it waits out its settle delay; the settling run still
/// fires its sink but hands the display and clock to its successor.
#[derive(Clone)]
pub struct PatternChallenge {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PatternChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternChallenge")
            .field("config", &self.inner.config)
            .field("collaborators", &self.inner.collaborators)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl PatternChallenge {
    /// Starts building a challenge for `config`.
    #[must_use]
    pub fn builder(config: ChallengeConfig) -> PatternChallengeBuilder {
        PatternChallengeBuilder::new(config)
    }

    /// The configuration this challenge was built with.
    #[must_use]
    pub fn config(&self) -> &ChallengeConfig {
        &self.inner.config
    }

    /// Starts a run unless one is already active.
    ///
    /// On success a fresh master pattern is drawn, the simulation clock is
    /// paused, the display is shown, and round 1 is revealed before this
    /// returns.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start_challenge(&self) -> StartOutcome {
        let inner = &self.inner;
        let mut session = inner.session();

        if let Some(run) = session.live.as_ref() {
            let phase = run.state.phase();
            let round = run.state.current_round();
            if phase.is_active() {
                warn!(
                    run_id = run.state.run_id(),
                    %phase,
                    round,
                    "challenge already in progress; start ignored"
                );
                inner.emit(Event::ChallengeRejected {
                    timestamp: Utc::now(),
                    phase,
                    round,
                });
                metrics::record_run("rejected");
                return StartOutcome::Rejected { phase, round };
            }
        }
        if let Some(prior) = session.live.take() {
            // The settling run keeps its sink but gives up the display and
            // the clock before the new run claims them.
            let prior_id = prior.state.run_id();
            let outcome = prior.state.phase();
            debug!(run_id = prior_id, phase = %outcome, "superseding a settling run");
            if let Some(display) = inner.display() {
                display.hide();
            }
            inner.collaborators.clock.resume();
            session.settling.push(SettlingRun {
                run_id: prior_id,
                outcome,
                cancel: prior.cancel,
            });
        }

        let run_id = inner.next_run_id.fetch_add(1, Ordering::SeqCst) + 1;
        let pattern = inner
            .patterns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_pattern(inner.config.total_rounds, inner.range);
        info!(run_id, rounds = pattern.len(), "challenge started");
        debug!(run_id, %pattern, "master pattern drawn");

        let mut state = ChallengeState::new(run_id, pattern, inner.range);
        let total_rounds = state.total_rounds();
        let cancel = CancellationToken::new();
        let (signals, signal_rx) = mpsc::unbounded_channel();

        inner.collaborators.clock.pause();
        if let Some(display) = inner.display() {
            display.show();
        } else {
            warn!(run_id, "no display attached; running without one");
            metrics::record_missing_collaborator("display");
        }
        inner.emit(Event::ChallengeStarted {
            timestamp: Utc::now(),
            run_id,
            total_rounds,
        });
        metrics::record_run("started");

        inner.reveal(&mut state, 1);
        session.live = Some(LiveRun {
            state,
            cancel: cancel.clone(),
            signals,
        });
        inner.publish(&session);
        drop(session);

        let driver = Driver {
            inner: Arc::clone(inner),
            run_id,
            total_rounds,
            cancel,
            signals: signal_rx,
            started_at: Instant::now(),
        };
        tokio::spawn(driver.run());

        StartOutcome::Started { run_id }
    }

    /// Feeds one player symbol to the live run.
    ///
    /// Only takes effect while the run is `AwaitingInput`; anything else
    /// is dropped and reported as [`InputOutcome::Ignored`].
    pub fn submit_symbol(&self, symbol: Symbol) -> InputOutcome {
        let inner = &self.inner;
        let mut session = inner.session();

        let Some(run) = session.live.as_mut() else {
            let outcome = InputOutcome::Ignored {
                phase: ChallengePhase::Idle,
            };
            metrics::record_input(&outcome);
            return outcome;
        };

        let outcome = run.state.accept(symbol);
        let run_id = run.state.run_id();
        let round = run.state.current_round();
        let display = inner.display();

        match outcome {
            InputOutcome::Ignored { phase } => {
                debug!(run_id, %symbol, %phase, "input outside the input window dropped");
            }
            InputOutcome::OutOfRange { symbol } => {
                debug!(run_id, %symbol, range = %inner.range, "symbol out of range dropped");
            }
            InputOutcome::Accepted { position, .. } => {
                if let Some(display) = display {
                    display.show_input_feedback(symbol, true, position);
                }
                inner.emit(Event::InputAccepted {
                    timestamp: Utc::now(),
                    run_id,
                    round,
                    position,
                    symbol,
                });
            }
            InputOutcome::RoundCompleted { round, last } => {
                let position = run.state.current_input().len();
                if let Some(display) = display {
                    display.show_input_feedback(symbol, true, position);
                }
                inner.emit(Event::InputAccepted {
                    timestamp: Utc::now(),
                    run_id,
                    round,
                    position,
                    symbol,
                });
                inner.emit(Event::RoundCompleted {
                    timestamp: Utc::now(),
                    run_id,
                    round,
                });
                if last {
                    if let Some(display) = display {
                        display.show_success();
                    }
                }
                info!(run_id, round, last, "round completed");
                if run.signals.send(RoundSignal::Completed).is_err() {
                    debug!(run_id, round, "driver gone; round completion dropped");
                }
            }
            InputOutcome::Mismatch {
                position,
                expected,
                received,
            } => {
                if let Some(display) = display {
                    display.show_input_feedback(received, false, position);
                }
                inner.emit(Event::InputMismatch {
                    timestamp: Utc::now(),
                    run_id,
                    round,
                    position,
                    expected,
                    received,
                });
                if let Some(display) = display {
                    display.show_failure();
                }
                info!(run_id, round, position, %expected, %received, "wrong symbol");
                if run.signals.send(RoundSignal::Failed).is_err() {
                    debug!(run_id, round, "driver gone; mismatch dropped");
                }
            }
        }

        if outcome.was_accepted() {
            inner.publish(&session);
        }
        drop(session);

        metrics::record_input(&outcome);
        outcome
    }

    /// Abandons the live run and any superseded run still settling,
    /// without firing either sink.
    ///
    /// Hides the display and resumes the simulation clock whether or not
    /// a run was live. Returns `true` if any run was cancelled.
    pub fn cancel_challenge(&self) -> bool {
        let inner = &self.inner;
        let mut session = inner.session();

        let taken = session.live.take();
        if let Some(run) = &taken {
            run.cancel.cancel();
        }
        let settling = std::mem::take(&mut session.settling);
        for run in &settling {
            run.cancel.cancel();
        }
        if let Some(display) = inner.display() {
            display.hide();
        }
        inner.collaborators.clock.resume();
        inner.publish(&session);
        drop(session);

        let cancelled: Vec<(u64, ChallengePhase)> = settling
            .iter()
            .map(|run| (run.run_id, run.outcome))
            .chain(taken.iter().map(|run| (run.state.run_id(), run.state.phase())))
            .collect();
        if cancelled.is_empty() {
            debug!("cancel requested with no run in progress");
            return false;
        }

        for (run_id, phase) in cancelled {
            info!(run_id, %phase, "challenge cancelled");
            inner.emit(Event::ChallengeCancelled {
                timestamp: Utc::now(),
                run_id,
                phase,
            });
            metrics::record_run("cancelled");
        }
        metrics::set_current_round(0);
        true
    }

    /// Current view of the challenge.
    #[must_use]
    pub fn snapshot(&self) -> ChallengeSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ChallengePhase {
        self.inner.snapshot_tx.borrow().phase
    }

    /// Subscribes to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChallengeSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Waits until no run is live.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|s| s.phase == ChallengePhase::Idle).await;
    }
}

// ============================================================================
// Run driver
// ============================================================================

struct Driver {
    inner: Arc<Inner>,
    run_id: u64,
    total_rounds: u32,
    cancel: CancellationToken,
    signals: mpsc::UnboundedReceiver<RoundSignal>,
    started_at: Instant,
}

impl Driver {
    async fn run(mut self) {
        let _guard = RunGuard {
            inner: Arc::clone(&self.inner),
            run_id: self.run_id,
        };
        let total = self.total_rounds;

        for round in 1..=total {
            // Round 1 is revealed by `start_challenge`.
            if round > 1 && self.with_run(|inner, state| inner.reveal(state, round)).is_none() {
                return;
            }
            if !self.pace(self.inner.config.pattern_display_time).await {
                return;
            }

            let opened = self.with_run(|inner, state| {
                state.open_input();
                if let Some(display) = inner.display() {
                    display.show_input_slots(round);
                }
            });
            if opened.is_none() {
                return;
            }
            debug!(run_id = self.run_id, round, "awaiting input");

            let signal = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                signal = self.signals.recv() => match signal {
                    Some(signal) => signal,
                    None => return,
                },
            };

            match signal {
                RoundSignal::Completed if round < total => {
                    let shown = self.with_run(|inner, _| {
                        if let Some(display) = inner.display() {
                            display.show_round_complete();
                        }
                    });
                    if shown.is_none() || !self.pace(self.inner.config.round_grace).await {
                        return;
                    }
                }
                RoundSignal::Completed => {
                    self.conclude(ChallengePhase::Succeeded, round).await;
                    return;
                }
                RoundSignal::Failed => {
                    self.conclude(ChallengePhase::Failed, round).await;
                    return;
                }
            }
        }
    }

    /// Runs `f` against this driver's run if it still owns the session.
    fn with_run<T>(&self, f: impl FnOnce(&Inner, &mut ChallengeState) -> T) -> Option<T> {
        let mut session = self.inner.session();
        let run = session
            .live
            .as_mut()
            .filter(|run| run.state.run_id() == self.run_id)?;
        let out = f(&self.inner, &mut run.state);
        self.inner.publish(&session);
        Some(out)
    }

    /// Sleeps for `duration`; `false` if the run was cancelled meanwhile.
    async fn pace(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    /// Waits out the settle delay, then fires the outcome's sink.
    ///
    /// The outcome was fixed, and its banner shown, when the deciding
    /// symbol was accepted. A run superseded in the meantime still fires
    /// its sink; only the owner hides the display, resumes the clock and
    /// returns the challenge to `Idle`.
    async fn conclude(&self, outcome: ChallengePhase, round: u32) {
        if !self.pace(self.inner.config.settle_delay).await {
            return;
        }

        let inner = &self.inner;
        let collaborators = &inner.collaborators;
        let mut session = inner.session();
        if self.cancel.is_cancelled() {
            return;
        }
        session.settling.retain(|run| run.run_id != self.run_id);
        let owns = session.owned_by(self.run_id);

        if outcome == ChallengePhase::Succeeded {
            if let Some(barrier) = &collaborators.barrier {
                barrier.release_barrier();
            } else {
                warn!(run_id = self.run_id, "no barrier attached; success has no effect");
                metrics::record_missing_collaborator("barrier");
            }
            if owns {
                if let Some(display) = inner.display() {
                    display.hide();
                }
                collaborators.clock.resume();
            }
        } else {
            if owns {
                collaborators.clock.resume();
            }
            if let Some(reset) = &collaborators.level_reset {
                reset.hard_reset();
            } else {
                warn!(run_id = self.run_id, "no level reset attached; failure has no effect");
                metrics::record_missing_collaborator("level_reset");
            }
            if owns {
                if let Some(display) = inner.display() {
                    display.hide();
                }
            }
        }

        if owns {
            session.live = None;
            inner.publish(&session);
            metrics::set_current_round(0);
        }
        drop(session);

        let elapsed = self.started_at.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        metrics::record_run_duration(outcome, elapsed);
        if outcome == ChallengePhase::Succeeded {
            info!(run_id = self.run_id, duration_ms, "challenge succeeded; barrier released");
            inner.emit(Event::ChallengeSucceeded {
                timestamp: Utc::now(),
                run_id: self.run_id,
                duration_ms,
            });
            metrics::record_run("succeeded");
        } else {
            info!(run_id = self.run_id, round, duration_ms, "challenge failed; level reset");
            inner.emit(Event::ChallengeFailed {
                timestamp: Utc::now(),
                run_id: self.run_id,
                round,
                duration_ms,
            });
            metrics::record_run("failed");
        }
    }
}

/// Releases the clock and display if a driver stops while still owning
/// the session (panic or runtime shutdown).
struct RunGuard {
    inner: Arc<Inner>,
    run_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut session = self.inner.session();
        session.settling.retain(|run| run.run_id != self.run_id);
        if !session.owned_by(self.run_id) {
            return;
        }
        warn!(run_id = self.run_id, "challenge driver stopped early; releasing clock");
        if let Some(run) = session.live.take() {
            run.cancel.cancel();
        }
        if let Some(display) = self.inner.display() {
            display.hide();
        }
        self.inner.collaborators.clock.resume();
        self.inner.publish(&session);
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`PatternChallenge`] and its collaborators.
#[must_use]
pub struct PatternChallengeBuilder {
    config: ChallengeConfig,
    display: Option<Arc<dyn ChallengeDisplay>>,
    barrier: Option<Arc<dyn BarrierRelease>>,
    level_reset: Option<Arc<dyn LevelReset>>,
    clock: Option<Arc<dyn SimulationClock>>,
    patterns: Option<Box<dyn PatternSource>>,
    events: Option<Arc<EventEmitter>>,
}

impl PatternChallengeBuilder {
    fn new(config: ChallengeConfig) -> Self {
        Self {
            config,
            display: None,
            barrier: None,
            level_reset: None,
            clock: None,
            patterns: None,
            events: None,
        }
    }

    /// Attaches the overlay renderer.
    pub fn display(mut self, display: Arc<dyn ChallengeDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    /// Attaches the success sink.
    pub fn barrier(mut self, barrier: Arc<dyn BarrierRelease>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Attaches the failure sink.
    pub fn level_reset(mut self, level_reset: Arc<dyn LevelReset>) -> Self {
        self.level_reset = Some(level_reset);
        self
    }

    /// Attaches the simulation clock. Defaults to a private [`PauseClock`].
    pub fn clock(mut self, clock: Arc<dyn SimulationClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides where master patterns come from.
    ///
    /// Defaults to [`RandomPatterns`], seeded from `config.seed` when set.
    pub fn patterns(mut self, patterns: Box<dyn PatternSource>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Attaches a structured event stream.
    pub fn events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validates the configuration and builds the challenge.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the round count, symbol
    /// range or display time is unusable.
    pub fn build(self) -> Result<PatternChallenge, ConfigError> {
        ensure_valid(&self.config)?;
        let range = SymbolRange::new(
            Symbol(self.config.min_symbol),
            Symbol(self.config.max_symbol),
        )?;

        let patterns = self.patterns.unwrap_or_else(|| match self.config.seed {
            Some(seed) => Box::new(RandomPatterns::seeded(seed)) as Box<dyn PatternSource>,
            None => Box::new(RandomPatterns::from_os()),
        });
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(PauseClock::new()) as Arc<dyn SimulationClock>);

        let (snapshot_tx, _) = watch::channel(ChallengeSnapshot::idle(self.config.total_rounds));

        Ok(PatternChallenge {
            inner: Arc::new(Inner {
                config: self.config,
                range,
                collaborators: Collaborators {
                    display: self.display,
                    barrier: self.barrier,
                    level_reset: self.level_reset,
                    clock,
                },
                patterns: Mutex::new(patterns),
                session: Mutex::new(Session::default()),
                snapshot_tx,
                next_run_id: AtomicU64::new(0),
                events: self.events,
            }),
        })
    }
}
