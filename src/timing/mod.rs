//! Pulse timing
//!
//! A pulse is the engine's only unit of time: a phase lasts
//! `pulses × pulse duration`. Pulses come from a [`PulseSource`], which
//! fires a single-shot completion per `start` call. Every start carries a
//! fresh [`TimerToken`] so a completion can be matched to the pulse that
//! scheduled it.
//!
//! - [`ManualPulseSource`]: completions are delivered by the caller (tests, stepping)
//! - [`TokioPulseSource`]: completions are posted to a channel by a sleep task

pub mod manual;
pub mod tokio_pulse;

use std::collections::HashMap;
use std::time::Duration;

use crate::phase::Phase;

pub use manual::ManualPulseSource;
pub use tokio_pulse::TokioPulseSource;

/// Identifies one scheduled pulse.
///
/// Tokens are issued by the engine in strictly increasing order; a
/// completion carrying any token other than the latest is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

impl TimerToken {
    /// Returns the token issued after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for TimerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// External timing primitive consumed by the engine.
///
/// Implementations must fire at most one completion per `start`, and none
/// after `stop`. A new `start` replaces any pending pulse.
pub trait PulseSource {
    /// Length of one pulse while `phase` is active.
    ///
    /// Read fresh each time a phase starts; it may differ between phases.
    fn pulse_duration(&self, phase: Phase) -> Duration;

    /// Schedules a single completion carrying `token` after `duration`.
    fn start(&mut self, token: TimerToken, duration: Duration);

    /// Abandons the pending pulse, if any.
    fn stop(&mut self);

    /// Fraction of the running pulse already elapsed, in `[0, 1]`.
    ///
    /// Returns 0 when no pulse is running.
    fn position(&self) -> f64;
}

/// Pulse lengths per phase: one base length with optional overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseTrack {
    base: Duration,
    overrides: HashMap<Phase, Duration>,
}

impl PulseTrack {
    /// Every phase pulses at `base`.
    #[must_use]
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            overrides: HashMap::new(),
        }
    }

    /// Sets a dedicated pulse length for `phase`.
    #[must_use]
    pub fn with_override(mut self, phase: Phase, duration: Duration) -> Self {
        self.overrides.insert(phase, duration);
        self
    }

    /// Pulse length for `phase`.
    #[must_use]
    pub fn duration_for(&self, phase: Phase) -> Duration {
        self.overrides.get(&phase).copied().unwrap_or(self.base)
    }
}

impl Default for PulseTrack {
    fn default() -> Self {
        Self::new(Duration::from_secs(4))
    }
}

/// Fraction of `duration` covered by `elapsed`, clamped to `[0, 1]`.
#[must_use]
pub fn fraction(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}
