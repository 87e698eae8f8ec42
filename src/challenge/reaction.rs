//! Single reaction challenge
//!
//! A challenge is armed with two consecutive windows. Input during the
//! neutral window is too early; input during the reaction window passes.
//! Running past both windows without input fails.
//!
//! ```text
//! 0 ──── neutral ────┤──── reaction ────┤──▶
//!        fail        │     success      │ fail (timeout)
//! ```

use std::time::Duration;

use serde::Serialize;

/// Default neutral window.
pub const DEFAULT_NEUTRAL_WINDOW: Duration = Duration::from_millis(1200);

/// Default reaction window.
pub const DEFAULT_REACTION_WINDOW: Duration = Duration::from_millis(800);

/// Identifies one challenge within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChallengeId(pub u64);

impl std::fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "challenge-{}", self.0)
    }
}

/// How the player responded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Key press, delivered to every armed challenge
    Key,
    /// Pointer press on one challenge
    Pointer,
}

/// Resolution state of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Still armed
    #[default]
    Pending,
    /// Input landed inside the reaction window
    Success,
    /// Input was early, or none arrived in time
    Fail,
}

impl Verdict {
    /// Lowercase label, used for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two timing windows of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeWindows {
    /// Leading window where input is too early
    pub neutral: Duration,
    /// Trailing window where input succeeds
    pub reaction: Duration,
}

impl ChallengeWindows {
    /// Creates a window pair.
    #[must_use]
    pub const fn new(neutral: Duration, reaction: Duration) -> Self {
        Self { neutral, reaction }
    }

    /// Combined length of both windows.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.neutral.saturating_add(self.reaction)
    }

    /// Whether input at `elapsed` passes: `neutral < elapsed <= total`.
    #[must_use]
    pub fn accepts(&self, elapsed: Duration) -> bool {
        elapsed > self.neutral && elapsed <= self.total()
    }
}

impl Default for ChallengeWindows {
    fn default() -> Self {
        Self::new(DEFAULT_NEUTRAL_WINDOW, DEFAULT_REACTION_WINDOW)
    }
}

/// Result of a resolved challenge, reported once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChallengeOutcome {
    /// Challenge that resolved
    pub id: ChallengeId,
    /// Final verdict, never `Pending`
    pub verdict: Verdict,
    /// Elapsed time at resolution
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// Input that resolved it, `None` on timeout
    pub input: Option<InputKind>,
}

impl ChallengeOutcome {
    /// Whether the challenge passed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

/// One armed reaction challenge.
#[derive(Debug, Clone)]
pub struct ReactionChallenge {
    id: ChallengeId,
    windows: ChallengeWindows,
    elapsed: Duration,
    verdict: Verdict,
}

impl ReactionChallenge {
    /// Arms a challenge with zero elapsed time.
    #[must_use]
    pub const fn new(id: ChallengeId, windows: ChallengeWindows) -> Self {
        Self {
            id,
            windows,
            elapsed: Duration::ZERO,
            verdict: Verdict::Pending,
        }
    }

    /// Advances the challenge by one frame.
    ///
    /// `input` is whatever the player did during this frame. Input is
    /// classified after the frame's delta is added. Returns the outcome
    /// on the frame the challenge resolves.
    ///
    /// # Panics
    ///
    /// Panics if the challenge already resolved.
    pub fn tick(&mut self, delta: Duration, input: Option<InputKind>) -> Option<ChallengeOutcome> {
        assert!(
            self.verdict == Verdict::Pending,
            "{} ticked after resolving as {}",
            self.id,
            self.verdict
        );

        self.elapsed = self.elapsed.saturating_add(delta);

        if let Some(kind) = input {
            let verdict = if self.windows.accepts(self.elapsed) {
                Verdict::Success
            } else {
                Verdict::Fail
            };
            return Some(self.resolve(verdict, Some(kind)));
        }
        if self.elapsed > self.windows.total() {
            return Some(self.resolve(Verdict::Fail, None));
        }
        None
    }

    fn resolve(&mut self, verdict: Verdict, input: Option<InputKind>) -> ChallengeOutcome {
        self.verdict = verdict;
        ChallengeOutcome {
            id: self.id,
            verdict,
            elapsed: self.elapsed,
            input,
        }
    }

    /// Challenge id.
    #[must_use]
    pub const fn id(&self) -> ChallengeId {
        self.id
    }

    /// Time since the challenge was armed.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Current verdict.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Whether the challenge still accepts ticks.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.verdict == Verdict::Pending
    }

    /// Window pair.
    #[must_use]
    pub const fn windows(&self) -> ChallengeWindows {
        self.windows
    }

    /// Closing-indicator progress: `elapsed / total`, clamped to `[0, 1]`.
    #[must_use]
    pub fn shrink_scale(&self) -> f64 {
        crate::timing::fraction(self.elapsed, self.windows.total())
    }

    /// Where the reaction window starts on the closing indicator:
    /// `reaction / total`.
    #[must_use]
    pub fn target_scale(&self) -> f64 {
        let total = self.windows.total();
        if total.is_zero() {
            return 0.0;
        }
        self.windows.reaction.as_secs_f64() / total.as_secs_f64()
    }
}
