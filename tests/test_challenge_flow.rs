//! End-to-end runs of the challenge against recording collaborators,
//! on tokio's paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Call, Recorder, config, enter, scripted, wait_for, wired};
use simonlock::challenge::{
    ChallengePhase, InputOutcome, PatternChallenge, ScriptedPatterns, StartOutcome, Symbol,
};
use simonlock::observability::EventEmitter;

const PATTERN: [u8; 4] = [2, 4, 1, 3];

// ============================================================================
// Worked scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn full_pattern_releases_barrier_once() {
    let (challenge, rec) = scripted(&PATTERN);
    assert!(challenge.start_challenge().is_started());

    enter(&challenge, 1, &[2]).await;
    enter(&challenge, 2, &[2, 4]).await;
    enter(&challenge, 3, &[2, 4, 1]).await;
    enter(&challenge, 4, &[2, 4, 1, 3]).await;
    assert_eq!(challenge.phase(), ChallengePhase::Succeeded);

    challenge.wait_idle().await;
    let journal = &rec.journal;
    assert_eq!(journal.count(&Call::Release), 1);
    assert_eq!(journal.count(&Call::Reset), 0);
    assert_eq!(journal.count(&Call::RoundComplete), 3);
    assert!(!rec.paused());
}

#[tokio::test(start_paused = true)]
async fn wrong_third_symbol_fails_round_three() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();

    enter(&challenge, 1, &[2]).await;
    enter(&challenge, 2, &[2, 4]).await;
    wait_for(&challenge, ChallengePhase::AwaitingInput, 3).await;
    challenge.submit_symbol(Symbol(2));
    challenge.submit_symbol(Symbol(4));
    let outcome = challenge.submit_symbol(Symbol(2));

    assert_eq!(
        outcome,
        InputOutcome::Mismatch {
            position: 3,
            expected: Symbol(1),
            received: Symbol(2),
        }
    );
    assert_eq!(challenge.phase(), ChallengePhase::Failed);

    challenge.wait_idle().await;
    assert_eq!(rec.journal.count(&Call::Reset), 1);
    assert_eq!(rec.journal.count(&Call::Release), 0);
    assert!(!rec.paused());
}

#[tokio::test(start_paused = true)]
async fn start_while_awaiting_input_is_rejected() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;
    wait_for(&challenge, ChallengePhase::AwaitingInput, 2).await;
    let before = challenge.snapshot();

    let outcome = challenge.start_challenge();
    assert_eq!(
        outcome,
        StartOutcome::Rejected {
            phase: ChallengePhase::AwaitingInput,
            round: 2,
        }
    );

    let after = challenge.snapshot();
    assert_eq!(after.current_round, 2);
    assert_eq!(after.pattern, before.pattern);
    assert_eq!(after.run_id, before.run_id);
    assert_eq!(rec.journal.count(&Call::Pause), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_displaying_round_one() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();
    assert_eq!(challenge.phase(), ChallengePhase::DisplayingPattern);

    assert!(challenge.cancel_challenge());
    assert_eq!(challenge.phase(), ChallengePhase::Idle);
    assert!(!rec.paused());

    // The abandoned driver must not resurface.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let journal = &rec.journal;
    assert_eq!(journal.count(&Call::Slots(1)), 0);
    assert_eq!(journal.count(&Call::Release), 0);
    assert_eq!(journal.count(&Call::Reset), 0);
    assert_eq!(journal.count(&Call::Hide), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test(start_paused = true)]
async fn immediate_restart_keeps_pattern_and_round() {
    let (challenge, _rec) = scripted(&PATTERN);
    challenge.start_challenge();
    let first = challenge.snapshot();

    assert!(!challenge.start_challenge().is_started());
    let second = challenge.snapshot();
    assert_eq!(first.pattern, second.pattern);
    assert_eq!(first.current_round, second.current_round);
}

#[tokio::test(start_paused = true)]
async fn every_round_shows_exact_prefix() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;
    enter(&challenge, 2, &[2, 4]).await;
    enter(&challenge, 3, &[2, 4, 1]).await;
    enter(&challenge, 4, &[2, 4, 1, 3]).await;
    challenge.wait_idle().await;

    let shown = rec.journal.patterns();
    assert_eq!(
        shown,
        vec![
            (vec![2], 1),
            (vec![2, 4], 2),
            (vec![2, 4, 1], 3),
            (vec![2, 4, 1, 3], 4),
        ]
    );
    assert!(rec.journal.calls().iter().all(|c| match c {
        Call::Pattern { total, .. } => *total == 4,
        _ => true,
    }));
}

#[tokio::test(start_paused = true)]
async fn any_wrong_symbol_fails_exactly_once() {
    for round in 1..=4u32 {
        for position in 1..=round as usize {
            let (challenge, rec) = scripted(&PATTERN);
            challenge.start_challenge();
            for earlier in 1..round {
                enter(&challenge, earlier, &PATTERN[..earlier as usize]).await;
            }

            wait_for(&challenge, ChallengePhase::AwaitingInput, round).await;
            for symbol in &PATTERN[..position - 1] {
                challenge.submit_symbol(Symbol(*symbol));
            }
            let wrong = if PATTERN[position - 1] == 1 { 2 } else { 1 };
            let outcome = challenge.submit_symbol(Symbol(wrong));
            assert!(
                matches!(outcome, InputOutcome::Mismatch { position: p, .. } if p == position),
                "round {round} position {position}: {outcome:?}"
            );

            challenge.wait_idle().await;
            assert_eq!(rec.journal.count(&Call::Reset), 1);
            assert_eq!(rec.journal.count(&Call::Release), 0);
            assert!(!rec.paused());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn input_outside_window_changes_nothing() {
    let (challenge, _rec) = scripted(&PATTERN);

    assert_eq!(
        challenge.submit_symbol(Symbol(2)),
        InputOutcome::Ignored {
            phase: ChallengePhase::Idle
        }
    );

    challenge.start_challenge();
    let outcome = challenge.submit_symbol(Symbol(2));
    assert_eq!(
        outcome,
        InputOutcome::Ignored {
            phase: ChallengePhase::DisplayingPattern
        }
    );
    assert!(challenge.snapshot().current_input.is_empty());

    enter(&challenge, 1, &[2]).await;
    assert_eq!(challenge.phase(), ChallengePhase::RoundComplete);
    let outcome = challenge.submit_symbol(Symbol(2));
    assert!(matches!(outcome, InputOutcome::Ignored { .. }));
    let snapshot = challenge.snapshot();
    assert_eq!(snapshot.phase, ChallengePhase::RoundComplete);
    assert_eq!(snapshot.current_input, vec![Symbol(2)]);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_symbol_is_rejected() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();
    wait_for(&challenge, ChallengePhase::AwaitingInput, 1).await;

    assert_eq!(
        challenge.submit_symbol(Symbol(7)),
        InputOutcome::OutOfRange { symbol: Symbol(7) }
    );
    assert_eq!(challenge.phase(), ChallengePhase::AwaitingInput);
    assert!(
        !rec
            .journal
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Feedback { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_twice_matches_cancel_once() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;

    assert!(challenge.cancel_challenge());
    let once = (challenge.snapshot(), rec.paused());
    assert!(!challenge.cancel_challenge());
    let twice = (challenge.snapshot(), rec.paused());
    assert_eq!(once, twice);
    assert_eq!(once.0.phase, ChallengePhase::Idle);
    assert!(!once.1);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_grace_resumes_clock() {
    let (challenge, rec) = scripted(&PATTERN);
    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;
    assert_eq!(challenge.phase(), ChallengePhase::RoundComplete);

    challenge.cancel_challenge();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rec.paused());
    assert_eq!(rec.journal.patterns().len(), 1);
    assert_eq!(rec.journal.count(&Call::Release), 0);
    assert_eq!(rec.journal.count(&Call::Reset), 0);
}

// ============================================================================
// Ordering and pacing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn success_sequence_order() {
    let (challenge, rec) = scripted(&[3]);
    challenge.start_challenge();
    enter(&challenge, 1, &[3]).await;
    challenge.wait_idle().await;

    assert_eq!(
        rec.journal.calls(),
        vec![
            Call::Pause,
            Call::Show,
            Call::Pattern {
                symbols: vec![3],
                round: 1,
                total: 1
            },
            Call::Slots(1),
            Call::Feedback {
                symbol: 3,
                correct: true,
                position: 1
            },
            Call::Success,
            Call::Release,
            Call::Hide,
            Call::Resume,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failure_sequence_order() {
    let (challenge, rec) = scripted(&[3]);
    challenge.start_challenge();
    enter(&challenge, 1, &[4]).await;
    challenge.wait_idle().await;

    let calls = rec.journal.calls();
    let tail = &calls[calls.len() - 5..];
    assert_eq!(
        tail,
        &[
            Call::Feedback {
                symbol: 4,
                correct: false,
                position: 1
            },
            Call::Failure,
            Call::Resume,
            Call::Reset,
            Call::Hide,
        ]
    );
}

fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(10),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn pacing_follows_configured_intervals() {
    let (challenge, _rec) = scripted(&[1, 2]);
    let started = tokio::time::Instant::now();
    challenge.start_challenge();

    wait_for(&challenge, ChallengePhase::AwaitingInput, 1).await;
    assert_near(started.elapsed(), Duration::from_secs(4));

    challenge.submit_symbol(Symbol(1));
    wait_for(&challenge, ChallengePhase::DisplayingPattern, 2).await;
    assert_near(started.elapsed(), Duration::from_millis(5_500));

    enter(&challenge, 2, &[1, 2]).await;
    assert_near(started.elapsed(), Duration::from_millis(9_500));
    challenge.wait_idle().await;
    assert_near(started.elapsed(), Duration::from_millis(11_500));
}

#[tokio::test(start_paused = true)]
async fn paused_world_does_not_stall_challenge() {
    let (challenge, rec) = scripted(&[1]);
    challenge.start_challenge();
    assert!(rec.paused());
    // Timers keep running while the simulation clock is paused.
    wait_for(&challenge, ChallengePhase::AwaitingInput, 1).await;
    assert!(rec.paused());
}

// ============================================================================
// Degraded collaborators
// ============================================================================

#[tokio::test(start_paused = true)]
async fn missing_display_runs_on_timers() {
    let recorder = Arc::new(Recorder::default());
    let challenge = PatternChallenge::builder(config(2))
        .barrier(recorder.clone())
        .clock(recorder.clone())
        .patterns(Box::new(ScriptedPatterns::new([vec![1, 1]])))
        .build()
        .unwrap();

    challenge.start_challenge();
    enter(&challenge, 1, &[1]).await;
    enter(&challenge, 2, &[1, 1]).await;
    challenge.wait_idle().await;

    assert_eq!(recorder.journal.count(&Call::Release), 1);
    assert_eq!(recorder.journal.count(&Call::Show), 0);
    assert!(!recorder.paused());
}

#[tokio::test(start_paused = true)]
async fn missing_reset_sink_still_returns_to_idle() {
    let recorder = Arc::new(Recorder::default());
    let challenge = PatternChallenge::builder(config(1))
        .display(recorder.clone())
        .clock(recorder.clone())
        .patterns(Box::new(ScriptedPatterns::new([vec![1]])))
        .build()
        .unwrap();

    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;
    challenge.wait_idle().await;

    assert_eq!(challenge.phase(), ChallengePhase::Idle);
    assert!(!recorder.paused());
    assert_eq!(recorder.journal.count(&Call::Hide), 1);
}

#[tokio::test(start_paused = true)]
async fn new_run_during_settle_takes_over() {
    let (challenge, rec) = scripted(&[1]);
    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;
    assert_eq!(challenge.phase(), ChallengePhase::Failed);

    let outcome = challenge.start_challenge();
    assert_eq!(outcome, StartOutcome::Started { run_id: 2 });
    // The settling run hands over the display and the clock.
    assert_eq!(rec.journal.count(&Call::Hide), 1);
    assert_eq!(rec.journal.count(&Call::Resume), 1);
    assert_eq!(rec.journal.count(&Call::Pause), 2);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let journal = &rec.journal;
    assert_eq!(journal.count(&Call::Failure), 1);
    assert_eq!(journal.count(&Call::Reset), 1);
    assert_eq!(journal.count(&Call::Resume), 1);
    assert!(rec.paused());
    assert_eq!(challenge.snapshot().run_id, Some(2));

    challenge.cancel_challenge();
    assert!(!rec.paused());
    assert_eq!(rec.journal.count(&Call::Resume), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_takeover_stops_settling_run() {
    let (challenge, rec) = scripted(&[1]);
    challenge.start_challenge();
    enter(&challenge, 1, &[2]).await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    challenge.start_challenge();
    assert!(challenge.cancel_challenge());
    assert_eq!(challenge.phase(), ChallengePhase::Idle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rec.journal.count(&Call::Reset), 0);
    assert_eq!(rec.journal.count(&Call::Release), 0);
    assert!(!rec.paused());
}

// ============================================================================
// Event stream
// ============================================================================

#[tokio::test(start_paused = true)]
async fn events_trace_a_successful_run() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let emitter = Arc::new(EventEmitter::from_file(file.path()).unwrap());
    let recorder = Arc::new(Recorder::default());
    let challenge = wired(config(2), &recorder)
        .patterns(Box::new(ScriptedPatterns::new([vec![3, 1]])))
        .events(emitter.clone())
        .build()
        .unwrap();

    challenge.start_challenge();
    enter(&challenge, 1, &[3]).await;
    enter(&challenge, 2, &[3, 1]).await;
    challenge.wait_idle().await;

    let text = std::fs::read_to_string(file.path()).unwrap();
    let types: Vec<String> = text
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        types,
        vec![
            "ChallengeStarted",
            "RoundStarted",
            "InputAccepted",
            "RoundCompleted",
            "RoundStarted",
            "InputAccepted",
            "InputAccepted",
            "RoundCompleted",
            "ChallengeSucceeded",
        ]
    );
    assert_eq!(emitter.event_count(), 9);
}
