//! Terminal session hosting one challenge.
//!
//! Wires the console display, the in-memory world and the pause clock to
//! a [`PatternChallenge`], then feeds it lines from stdin until the player
//! quits, stdin closes, or (with `--once`) the first run finishes.

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::challenge::{
    ChallengePhase, ChallengeSnapshot, ChallengeTrigger, PatternChallenge, TriggerOutcome,
};
use crate::cli::args::PlayArgs;
use crate::clock::PauseClock;
use crate::config::{ConfigLoader, SessionConfig};
use crate::display::ConsoleDisplay;
use crate::error::ChallengeError;
use crate::input::{KeyCommand, KeyMap};
use crate::observability::{Event, EventEmitter, SessionSummary, init_metrics};
use crate::world::{CheckpointLedger, ShieldBarrier};

/// Resolves the session configuration: file (or defaults), then flags.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be loaded.
pub fn resolve_config(args: &PlayArgs) -> Result<SessionConfig, ChallengeError> {
    let mut session = match &args.config {
        Some(path) => {
            let loaded = ConfigLoader::with_defaults().load(path)?;
            for warning in &loaded.warnings {
                warn!(
                    location = warning.location.as_deref().unwrap_or("<unknown>"),
                    "{}",
                    warning.message
                );
            }
            (*loaded.config).clone()
        }
        None => SessionConfig::default(),
    };

    let challenge = &mut session.challenge;
    if let Some(rounds) = args.rounds {
        challenge.total_rounds = rounds;
    }
    if let Some(display_time) = args.display_time {
        challenge.pattern_display_time = display_time;
    }
    if let Some(min) = args.min_symbol {
        challenge.min_symbol = min;
    }
    if let Some(max) = args.max_symbol {
        challenge.max_symbol = max;
    }
    if args.seed.is_some() {
        challenge.seed = args.seed;
    }
    if args.allow_repeat {
        session.trigger.allow_repeat = true;
    }
    Ok(session)
}

/// Counts what happened during the session.
#[derive(Debug, Default)]
struct Tally {
    runs: u64,
    cancelled: u64,
    last_round: u32,
}

/// Host a challenge session on stdin/stdout.
///
/// # Errors
///
/// Returns a configuration error for an unusable configuration, an I/O
/// error if stdin or the event file fail, and
/// [`ChallengeError::ChallengeFailed`] when `--once` ends in failure.
pub async fn run(args: &PlayArgs, shutdown: CancellationToken) -> Result<(), ChallengeError> {
    let session = resolve_config(args)?;

    if args.metrics_port.is_some() {
        init_metrics(args.metrics_port)?;
    }
    let events = args
        .events
        .as_deref()
        .map(EventEmitter::from_file)
        .transpose()?
        .map(Arc::new);

    let clock = Arc::new(PauseClock::new());
    let barrier = Arc::new(ShieldBarrier::new());
    let ledger = Arc::new(CheckpointLedger::new("level-start"));
    ledger.register(barrier.clone());

    let mut builder = PatternChallenge::builder(session.challenge.clone())
        .display(Arc::new(ConsoleDisplay::stdout()))
        .barrier(barrier.clone())
        .level_reset(ledger.clone())
        .clock(clock.clone());
    if let Some(events) = &events {
        builder = builder.events(Arc::clone(events));
    }
    let challenge = builder.build()?;

    let trigger = Arc::new(ChallengeTrigger::new(
        challenge.clone(),
        session.trigger.allow_repeat,
    ));
    ledger.register(trigger.clone());

    let keymap = KeyMap::new(session.challenge.symbol_range());
    println!("{}", keymap.help());
    info!(
        rounds = session.challenge.total_rounds,
        range = %session.challenge.symbol_range(),
        "session ready"
    );

    let mut tally = Tally::default();
    let mut snapshots = challenge.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    'session: loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("shutdown requested");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if observe(&mut tally, &snapshot, args.once) {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("input closed");
                    break;
                };
                for command in keymap.parse_line(&line) {
                    match command {
                        KeyCommand::Fire => fire(&trigger, &mut tally),
                        KeyCommand::Symbol(symbol) => {
                            challenge.submit_symbol(symbol);
                        }
                        KeyCommand::Cancel => {
                            if challenge.cancel_challenge() {
                                tally.cancelled += 1;
                                println!("Challenge cancelled.");
                            }
                        }
                        KeyCommand::Quit => break 'session,
                    }
                }
            }
        }
    }

    if challenge.cancel_challenge() {
        tally.cancelled += 1;
    }

    let summary = SessionSummary {
        runs: tally.runs,
        succeeded: barrier.release_count(),
        failed: ledger.reset_count(),
        cancelled: tally.cancelled,
    };
    if let Some(events) = &events {
        events.emit(Event::SessionSummary {
            timestamp: Utc::now(),
            summary,
        });
    }
    info!(
        runs = summary.runs,
        succeeded = summary.succeeded,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "session finished"
    );
    println!(
        "runs: {}, succeeded: {}, failed: {}, cancelled: {}",
        summary.runs, summary.succeeded, summary.failed, summary.cancelled
    );

    if args.once && summary.failed > 0 {
        return Err(ChallengeError::ChallengeFailed {
            round: tally.last_round,
        });
    }
    Ok(())
}

fn fire(trigger: &ChallengeTrigger, tally: &mut Tally) {
    match trigger.on_shot_hit() {
        TriggerOutcome::Started { .. } => tally.runs += 1,
        TriggerOutcome::AlreadyActivated => println!("The enemy is already down."),
        TriggerOutcome::Busy { phase } => println!("Challenge busy ({phase})."),
    }
}

/// Records a snapshot; `true` when a `--once` session is done.
fn observe(tally: &mut Tally, snapshot: &ChallengeSnapshot, once: bool) -> bool {
    if snapshot.phase == ChallengePhase::Idle {
        return once && tally.runs > 0;
    }
    tally.last_round = snapshot.current_round;
    false
}
