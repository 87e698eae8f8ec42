//! Duration strings
//!
//! Configuration durations are written as a number with a unit suffix:
//! `ms`, `s`, `m` or `h`. The number may be fractional (`1.2s`, `0.5m`).

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A duration string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationError {
    /// The rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: &'static str,
}

/// Parses a duration string like `"1.2s"`, `"800ms"` or `"2m"`.
///
/// # Errors
///
/// Returns an error if the suffix is missing or unknown, or the number is
/// negative, not finite, or not a number.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim();
    let fail = |reason| DurationError {
        input: s.to_string(),
        reason,
    };

    // `ms` must be checked before `m` and `s`.
    let (number, scale) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600.0)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60.0)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1.0)
    } else {
        return Err(fail("expected suffix: ms, s, m, h"));
    };

    let value: f64 = number.trim().parse().map_err(|_| fail("not a number"))?;
    if !value.is_finite() {
        return Err(fail("not a finite number"));
    }
    if value < 0.0 {
        return Err(fail("must not be negative"));
    }

    Duration::try_from_secs_f64(value * scale).map_err(|_| fail("out of range"))
}

/// Formats a duration the way it is written in configuration files.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() % 1_000_000 == 0 && d.as_millis() % 1000 != 0 {
        format!("{}ms", d.as_millis())
    } else if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}s", d.as_secs_f64())
    }
}

/// A `Duration` read from and written as a duration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfigDuration(pub Duration);

impl ConfigDuration {
    /// Wraps whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Wraps milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }
}

impl From<ConfigDuration> for Duration {
    fn from(d: ConfigDuration) -> Self {
        d.0
    }
}

impl std::fmt::Display for ConfigDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl Serialize for ConfigDuration {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_duration(self.0))
    }
}

impl<'de> Deserialize<'de> for ConfigDuration {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        parse_duration(&raw).map(Self).map_err(serde::de::Error::custom)
    }
}
