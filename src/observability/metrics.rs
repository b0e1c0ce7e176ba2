//! Metrics collection.
//!
//! Prometheus-compatible counters, gauges and histograms for challenge
//! runs. Every label value comes from a closed set, so cardinality is
//! bounded by construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::challenge::{ChallengePhase, InputOutcome};
use crate::error::ChallengeError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`; otherwise the recorder is installed without an
/// endpoint.
///
/// # Errors
///
/// Returns `ChallengeError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), ChallengeError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| ChallengeError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "simonlock_runs_total",
        "Challenge runs by outcome (started, succeeded, failed, cancelled, rejected)"
    );
    describe_counter!(
        "simonlock_inputs_total",
        "Submitted symbols by verdict"
    );
    describe_gauge!("simonlock_current_round", "Round of the active run (0 = idle)");
    describe_histogram!(
        "simonlock_run_duration_ms",
        "Wall-clock duration of finished runs in milliseconds"
    );
    describe_counter!(
        "simonlock_missing_collaborator_total",
        "Collaborator calls skipped because nothing was attached"
    );
}

/// Records a run lifecycle event (`started`, `succeeded`, ...).
pub fn record_run(outcome: &'static str) {
    counter!("simonlock_runs_total", "outcome" => outcome).increment(1);
}

/// Records the verdict on a submitted symbol.
pub fn record_input(outcome: &InputOutcome) {
    counter!("simonlock_inputs_total", "verdict" => input_label(outcome)).increment(1);
}

/// Sets the active-round gauge.
pub fn set_current_round(round: u32) {
    gauge!("simonlock_current_round").set(f64::from(round));
}

/// Records the duration of a finished run.
pub fn record_run_duration(phase: ChallengePhase, duration: Duration) {
    histogram!("simonlock_run_duration_ms", "outcome" => phase.as_str())
        .record(duration.as_secs_f64() * 1000.0);
}

/// Records a skipped collaborator call.
pub fn record_missing_collaborator(role: &'static str) {
    counter!("simonlock_missing_collaborator_total", "role" => role).increment(1);
}

const fn input_label(outcome: &InputOutcome) -> &'static str {
    match outcome {
        InputOutcome::Ignored { .. } => "ignored",
        InputOutcome::OutOfRange { .. } => "out_of_range",
        InputOutcome::Accepted { .. } => "accepted",
        InputOutcome::RoundCompleted { .. } => "round_completed",
        InputOutcome::Mismatch { .. } => "mismatch",
    }
}
