//! The challenge-starting enemy, alone and wired into the in-memory world.

mod common;

use std::sync::Arc;

use common::{Call, config, enter, scripted};
use simonlock::challenge::{
    ChallengePhase, ChallengeTrigger, PatternChallenge, ScriptedPatterns, SimulationClock,
    Symbol, TriggerOutcome,
};
use simonlock::clock::PauseClock;
use simonlock::world::{CheckpointLedger, ShieldBarrier};

#[tokio::test(start_paused = true)]
async fn first_hit_starts_challenge() {
    let (challenge, rec) = scripted(&[1, 2]);
    let trigger = ChallengeTrigger::new(challenge.clone(), false);

    assert_eq!(trigger.on_shot_hit(), TriggerOutcome::Started { run_id: 1 });
    assert!(trigger.is_activated());
    assert_eq!(challenge.phase(), ChallengePhase::DisplayingPattern);
    assert_eq!(rec.journal.count(&Call::Pause), 1);
}

#[tokio::test(start_paused = true)]
async fn second_hit_is_ignored_without_repeat() {
    let (challenge, _rec) = scripted(&[1]);
    let trigger = ChallengeTrigger::new(challenge.clone(), false);
    trigger.on_shot_hit();
    challenge.cancel_challenge();

    assert_eq!(trigger.on_shot_hit(), TriggerOutcome::AlreadyActivated);
    assert_eq!(challenge.phase(), ChallengePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn repeat_trigger_restarts_after_cancel() {
    let (challenge, _rec) = scripted(&[1]);
    let trigger = ChallengeTrigger::new(challenge.clone(), true);
    trigger.on_shot_hit();
    challenge.cancel_challenge();

    assert_eq!(trigger.on_shot_hit(), TriggerOutcome::Started { run_id: 2 });
}

#[tokio::test(start_paused = true)]
async fn hit_while_busy_still_spends_trigger() {
    let (challenge, _rec) = scripted(&[1, 2]);
    challenge.start_challenge();
    let trigger = ChallengeTrigger::new(challenge.clone(), false);

    assert_eq!(
        trigger.on_shot_hit(),
        TriggerOutcome::Busy {
            phase: ChallengePhase::DisplayingPattern
        }
    );
    assert!(trigger.is_activated());
    assert_eq!(trigger.on_shot_hit(), TriggerOutcome::AlreadyActivated);
}

#[tokio::test(start_paused = true)]
async fn reset_rearms_trigger() {
    let (challenge, _rec) = scripted(&[1]);
    let trigger = ChallengeTrigger::new(challenge.clone(), false);
    trigger.on_shot_hit();
    challenge.cancel_challenge();

    trigger.reset();
    assert!(!trigger.is_activated());
    assert_eq!(trigger.on_shot_hit(), TriggerOutcome::Started { run_id: 2 });
}

struct World {
    challenge: PatternChallenge,
    trigger: Arc<ChallengeTrigger>,
    clock: Arc<PauseClock>,
    barrier: Arc<ShieldBarrier>,
    ledger: Arc<CheckpointLedger>,
}

fn world(patterns: Vec<Vec<u8>>) -> World {
    let clock = Arc::new(PauseClock::new());
    let barrier = Arc::new(ShieldBarrier::with_linked_enemies(2));
    let ledger = Arc::new(CheckpointLedger::new("spawn"));
    ledger.register(barrier.clone());

    let rounds = u32::try_from(patterns[0].len()).unwrap();
    let challenge = PatternChallenge::builder(config(rounds))
        .barrier(barrier.clone())
        .level_reset(ledger.clone())
        .clock(clock.clone())
        .patterns(Box::new(ScriptedPatterns::new(patterns)))
        .build()
        .unwrap();
    let trigger = Arc::new(ChallengeTrigger::new(challenge.clone(), false));
    ledger.register(trigger.clone());

    World {
        challenge,
        trigger,
        clock,
        barrier,
        ledger,
    }
}

#[tokio::test(start_paused = true)]
async fn failure_resets_level_and_rearms_trigger() {
    let w = world(vec![vec![2, 3], vec![4, 4]]);
    w.ledger.set_checkpoint("gate");
    w.barrier.notify_enemy_destroyed();

    w.trigger.on_shot_hit();
    assert!(w.clock.is_paused());
    enter(&w.challenge, 1, &[1]).await;
    w.challenge.wait_idle().await;

    assert_eq!(w.ledger.reset_count(), 1);
    assert_eq!(w.ledger.current(), "spawn");
    assert_eq!(w.barrier.remaining_enemies(), 2);
    assert!(!w.trigger.is_activated());
    assert!(!w.clock.is_paused());

    // Brand-new run with a fresh pattern after the full reset.
    assert_eq!(w.trigger.on_shot_hit(), TriggerOutcome::Started { run_id: 2 });
    assert_eq!(w.challenge.snapshot().pattern, vec![Symbol(4), Symbol(4)]);
}

#[tokio::test(start_paused = true)]
async fn success_drops_barrier_for_good() {
    let w = world(vec![vec![2]]);
    w.trigger.on_shot_hit();
    enter(&w.challenge, 1, &[2]).await;
    w.challenge.wait_idle().await;

    assert!(w.barrier.is_released());
    assert_eq!(w.barrier.release_count(), 1);
    assert_eq!(w.ledger.reset_count(), 0);
    assert!(w.trigger.is_activated());
    assert_eq!(w.trigger.on_shot_hit(), TriggerOutcome::AlreadyActivated);
    assert!(!w.clock.is_paused());
}
