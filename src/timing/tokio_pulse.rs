//! Tokio-backed pulse source.
//!
//! Each `start` spawns a single-shot sleep task that posts its token to a
//! channel when the pulse elapses. `stop` (and any later `start`) cancels
//! the task, so at most one pulse is ever outstanding.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::phase::Phase;

use super::{PulseSource, PulseTrack, TimerToken, fraction};

#[derive(Debug)]
struct RunningPulse {
    token: TimerToken,
    cancel: CancellationToken,
    started_at: Instant,
    duration: Duration,
}

/// Pulse source driven by the tokio timer.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioPulseSource {
    track: PulseTrack,
    completions: mpsc::UnboundedSender<TimerToken>,
    running: Option<RunningPulse>,
}

impl TokioPulseSource {
    /// Creates a source that posts completions to `completions`.
    #[must_use]
    pub const fn new(track: PulseTrack, completions: mpsc::UnboundedSender<TimerToken>) -> Self {
        Self {
            track,
            completions,
            running: None,
        }
    }

    /// Creates a source together with the receiving end of its channel.
    #[must_use]
    pub fn channel(track: PulseTrack) -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(track, tx), rx)
    }
}

impl PulseSource for TokioPulseSource {
    fn pulse_duration(&self, phase: Phase) -> Duration {
        self.track.duration_for(phase)
    }

    fn start(&mut self, token: TimerToken, duration: Duration) {
        self.stop();

        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let tx = self.completions.clone();
        // Deadline is fixed here, not when the task is first polled.
        let sleep = tokio::time::sleep(duration);
        tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => {
                    trace!(%token, "pulse cancelled");
                }
                () = sleep => {
                    // Receiver gone means the session is shutting down.
                    let _ = tx.send(token);
                }
            }
        });

        self.running = Some(RunningPulse {
            token,
            cancel,
            started_at: Instant::now(),
            duration,
        });
    }

    fn stop(&mut self) {
        if let Some(pulse) = self.running.take() {
            trace!(token = %pulse.token, "stopping pulse");
            pulse.cancel.cancel();
        }
    }

    fn position(&self) -> f64 {
        self.running
            .as_ref()
            .map_or(0.0, |p| fraction(p.started_at.elapsed(), p.duration))
    }
}

impl Drop for TokioPulseSource {
    fn drop(&mut self) {
        self.stop();
    }
}
