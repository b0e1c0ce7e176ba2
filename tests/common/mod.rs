//! Shared integration-test harness: recording collaborators for driving a
//! challenge in-process, and helpers for spawning the `simonlock` binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use simonlock::challenge::{
    BarrierRelease, ChallengeDisplay, ChallengePhase, LevelReset, PatternChallenge,
    PatternChallengeBuilder, ScriptedPatterns, SimulationClock, Symbol,
};
use simonlock::config::ChallengeConfig;

/// One observable call made by the challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Show,
    Hide,
    Pattern {
        symbols: Vec<u8>,
        round: u32,
        total: u32,
    },
    Slots(u32),
    Feedback {
        symbol: u8,
        correct: bool,
        position: usize,
    },
    RoundComplete,
    Success,
    Failure,
    Release,
    Reset,
    Pause,
    Resume,
}

/// Ordered log of every collaborator call, shared by all recorders.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Patterns shown, in order.
    pub fn patterns(&self) -> Vec<(Vec<u8>, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Pattern { symbols, round, .. } => Some((symbols, round)),
                _ => None,
            })
            .collect()
    }

    /// Index of the first occurrence of `call`.
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

/// Display, sinks and clock that all write to one [`Journal`].
#[derive(Debug, Default)]
pub struct Recorder {
    pub journal: Journal,
    paused: Mutex<bool>,
}

impl Recorder {
    pub fn paused(&self) -> bool {
        *self.paused.lock().unwrap()
    }
}

impl ChallengeDisplay for Recorder {
    fn show(&self) {
        self.journal.push(Call::Show);
    }

    fn hide(&self) {
        self.journal.push(Call::Hide);
    }

    fn show_pattern(&self, symbols: &[Symbol], round: u32, total_rounds: u32) {
        self.journal.push(Call::Pattern {
            symbols: symbols.iter().map(|s| s.0).collect(),
            round,
            total: total_rounds,
        });
    }

    fn show_input_slots(&self, round: u32) {
        self.journal.push(Call::Slots(round));
    }

    fn show_input_feedback(&self, symbol: Symbol, correct: bool, position: usize) {
        self.journal.push(Call::Feedback {
            symbol: symbol.0,
            correct,
            position,
        });
    }

    fn show_round_complete(&self) {
        self.journal.push(Call::RoundComplete);
    }

    fn show_success(&self) {
        self.journal.push(Call::Success);
    }

    fn show_failure(&self) {
        self.journal.push(Call::Failure);
    }
}

impl BarrierRelease for Recorder {
    fn release_barrier(&self) {
        self.journal.push(Call::Release);
    }
}

impl LevelReset for Recorder {
    fn hard_reset(&self) {
        self.journal.push(Call::Reset);
    }
}

impl SimulationClock for Recorder {
    fn pause(&self) {
        *self.paused.lock().unwrap() = true;
        self.journal.push(Call::Pause);
    }

    fn resume(&self) {
        *self.paused.lock().unwrap() = false;
        self.journal.push(Call::Resume);
    }

    fn is_paused(&self) -> bool {
        self.paused()
    }
}

/// Config with the shipped pacing and `rounds` rounds of symbols 1..=4.
pub fn config(rounds: u32) -> ChallengeConfig {
    ChallengeConfig {
        total_rounds: rounds,
        ..ChallengeConfig::default()
    }
}

/// Builder with every collaborator wired to `recorder`.
pub fn wired(config: ChallengeConfig, recorder: &Arc<Recorder>) -> PatternChallengeBuilder {
    PatternChallenge::builder(config)
        .display(recorder.clone())
        .barrier(recorder.clone())
        .level_reset(recorder.clone())
        .clock(recorder.clone())
}

/// A challenge whose first run uses `pattern`, plus its recorder.
pub fn scripted(pattern: &[u8]) -> (PatternChallenge, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let rounds = u32::try_from(pattern.len()).unwrap();
    let challenge = wired(config(rounds), &recorder)
        .patterns(Box::new(ScriptedPatterns::new([pattern.to_vec()])))
        .build()
        .unwrap();
    (challenge, recorder)
}

/// Waits until the challenge is in `phase` at `round`.
pub async fn wait_for(challenge: &PatternChallenge, phase: ChallengePhase, round: u32) {
    let mut rx = challenge.subscribe();
    rx.wait_for(|s| s.phase == phase && s.current_round == round)
        .await
        .unwrap();
}

/// Waits for the input window of `round` and types `symbols`.
pub async fn enter(challenge: &PatternChallenge, round: u32, symbols: &[u8]) {
    wait_for(challenge, ChallengePhase::AwaitingInput, round).await;
    for symbol in symbols {
        challenge.submit_symbol(Symbol(*symbol));
    }
}

// ============================================================================
// Binary helpers
// ============================================================================

/// Path to a YAML fixture under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs `simonlock` to completion with `args` and no stdin.
pub fn spawn_command(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_simonlock"))
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run simonlock")
}

/// Spawns `simonlock play` with piped stdin/stdout.
pub fn spawn_play(args: &[&str]) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_simonlock"))
        .arg("play")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn simonlock")
}

/// Timeout for a whole `play` session in process tests.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(10);
