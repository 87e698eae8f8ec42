//! Metrics collection for `phaseloop`.
//!
//! Prometheus-compatible metrics with typed convenience functions. Label
//! values come from closed enums, so cardinality is bounded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::challenge::Verdict;
use crate::error::PhaseLoopError;
use crate::phase::{GameOutcome, Phase};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `PhaseLoopError::Metrics` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), PhaseLoopError> {
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
    .map_err(|e| PhaseLoopError::Metrics(e.to_string()))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "phaseloop_phase_transitions_total",
        "Total number of phases started"
    );
    describe_gauge!(
        "phaseloop_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_gauge!("phaseloop_current_cycle", "Completed cycle counter");
    describe_counter!(
        "phaseloop_challenges_total",
        "Reaction challenges resolved, by result"
    );
    describe_counter!(
        "phaseloop_challenges_cancelled_total",
        "Reaction challenges cancelled before resolving"
    );
    describe_histogram!(
        "phaseloop_challenge_elapsed_ms",
        "Elapsed time at challenge resolution in milliseconds"
    );
    describe_counter!("phaseloop_games_total", "Finished games, by outcome");
}

/// Records a phase start and moves the current-phase gauge.
pub fn record_phase_started(phase: Phase, previous: Option<Phase>) {
    counter!("phaseloop_phase_transitions_total", "phase" => phase.as_str()).increment(1);
    if let Some(prev) = previous {
        gauge!("phaseloop_current_phase", "phase" => prev.as_str()).set(0.0);
    }
    gauge!("phaseloop_current_phase", "phase" => phase.as_str()).set(1.0);
}

/// Sets the cycle counter gauge.
pub fn set_current_cycle(cycle: u32) {
    gauge!("phaseloop_current_cycle").set(f64::from(cycle));
}

/// Records a resolved challenge.
pub fn record_challenge(verdict: Verdict, elapsed: Duration) {
    counter!("phaseloop_challenges_total", "result" => verdict.as_str()).increment(1);
    histogram!("phaseloop_challenge_elapsed_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// Records cancelled challenges.
pub fn record_challenges_cancelled(count: usize) {
    counter!("phaseloop_challenges_cancelled_total").increment(count as u64);
}

/// Records a finished game and clears the current-phase gauge.
pub fn record_game_over(outcome: GameOutcome, last_phase: Option<Phase>) {
    counter!("phaseloop_games_total", "outcome" => outcome.as_str()).increment(1);
    if let Some(phase) = last_phase {
        gauge!("phaseloop_current_phase", "phase" => phase.as_str()).set(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // metrics macros no-op when no global recorder is installed
        record_phase_started(Phase::Fall, None);
        record_phase_started(Phase::Repair, Some(Phase::Fall));
        set_current_cycle(2);
        record_challenge(Verdict::Success, Duration::from_millis(1500));
        record_challenge(Verdict::Fail, Duration::from_millis(2016));
        record_challenges_cancelled(3);
        record_game_over(GameOutcome::Lost, Some(Phase::Fall));
    }

    #[test]
    fn game_over_leaves_no_phase_active() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_phase_started(Phase::Fall, None);
            record_phase_started(Phase::Repair, Some(Phase::Fall));
            record_game_over(GameOutcome::Lost, Some(Phase::Repair));
        });

        let rendered = handle.render();
        assert!(
            rendered.contains("phaseloop_current_phase{phase=\"repair\"} 0"),
            "{rendered}"
        );
        assert!(
            rendered.contains("phaseloop_current_phase{phase=\"fall\"} 0"),
            "{rendered}"
        );
        assert!(
            rendered.contains("phaseloop_games_total{outcome=\"lost\"} 1"),
            "{rendered}"
        );
    }
}
