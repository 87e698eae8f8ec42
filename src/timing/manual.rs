//! Caller-driven pulse source.
//!
//! Records every `start`/`stop` and lets the caller decide when the
//! pending pulse completes. Clones share state, so a test can keep one
//! handle while the engine owns another.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::phase::Phase;

use super::{PulseSource, PulseTrack, TimerToken};

#[derive(Debug, Default)]
struct ManualState {
    pending: Option<(TimerToken, Duration)>,
    starts: Vec<(TimerToken, Duration)>,
    stops: usize,
    position: f64,
}

/// Pulse source whose completions are delivered by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualPulseSource {
    track: PulseTrack,
    state: Arc<Mutex<ManualState>>,
}

impl ManualPulseSource {
    /// Creates a source reporting pulse lengths from `track`.
    #[must_use]
    pub fn new(track: PulseTrack) -> Self {
        Self {
            track,
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Token of the pulse currently pending, if any.
    #[must_use]
    pub fn pending(&self) -> Option<TimerToken> {
        self.lock().pending.map(|(token, _)| token)
    }

    /// Takes the pending pulse's token, as if it had just fired.
    ///
    /// The caller hands the token to the engine.
    #[must_use]
    pub fn fire(&self) -> Option<TimerToken> {
        let mut state = self.lock();
        state.position = 0.0;
        state.pending.take().map(|(token, _)| token)
    }

    /// Sets the reported position within the running pulse.
    pub fn set_position(&self, position: f64) {
        self.lock().position = position.clamp(0.0, 1.0);
    }

    /// Every `start` call so far, in order.
    #[must_use]
    pub fn starts(&self) -> Vec<(TimerToken, Duration)> {
        self.lock().starts.clone()
    }

    /// Number of `stop` calls so far.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.lock().stops
    }
}

impl PulseSource for ManualPulseSource {
    fn pulse_duration(&self, phase: Phase) -> Duration {
        self.track.duration_for(phase)
    }

    fn start(&mut self, token: TimerToken, duration: Duration) {
        let mut state = self.lock();
        state.pending = Some((token, duration));
        state.starts.push((token, duration));
        state.position = 0.0;
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.pending = None;
        state.stops += 1;
        state.position = 0.0;
    }

    fn position(&self) -> f64 {
        let state = self.lock();
        if state.pending.is_some() {
            state.position
        } else {
            0.0
        }
    }
}
