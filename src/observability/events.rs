//! Structured event stream for `phaseloop`.
//!
//! Discrete, typed events emitted while a session runs. Events are
//! serialized as newline-delimited JSON (JSONL) and include a monotonically
//! increasing sequence number for ordering guarantees.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::challenge::{ChallengeId, ChallengeOutcome, InputKind, Verdict};
use crate::phase::{GameOutcome, Phase};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why the session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The game reached Won or Lost.
    GameOver,
    /// Stopped by a shutdown signal before the game ended.
    Interrupted,
}

impl StopReason {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameOver => "game_over",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Summary statistics emitted when the session stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Final completed-cycle counter.
    pub cycles: u32,
    /// Number of phases started.
    pub phases_started: u64,
    /// Challenges that passed.
    pub challenges_passed: u32,
    /// Challenges that failed.
    pub challenges_failed: u32,
    /// Challenges cancelled by stasis or game over.
    pub challenges_cancelled: u64,
    /// Terminal outcome, if the game ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
    /// Session run time in seconds.
    pub elapsed_secs: f64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycles={} phases={} passed={} failed={} cancelled={} elapsed={:.1}s",
            self.cycles,
            self.phases_started,
            self.challenges_passed,
            self.challenges_failed,
            self.challenges_cancelled,
            self.elapsed_secs,
        )?;
        if let Some(outcome) = self.outcome {
            write!(f, " outcome={outcome}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a session.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The session has started; the first Fall follows the settle delay.
    SessionStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
        /// Branch seed in use, if fixed.
        #[serde(skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
        /// Cycle threshold.
        cycles_before_game_over: u32,
    },

    /// The session has stopped.
    SessionStopped {
        /// When the session stopped.
        timestamp: DateTime<Utc>,
        /// Why the session stopped.
        reason: StopReason,
        /// Run summary statistics.
        summary: RunSummary,
    },

    /// A timed phase has started.
    PhaseStarted {
        /// When the phase started.
        timestamp: DateTime<Utc>,
        /// The phase.
        phase: Phase,
        /// Cycle counter at phase start.
        cycle: u32,
        /// Pulses the phase lasts.
        pulses: u32,
        /// Length of one pulse in milliseconds.
        pulse_ms: u64,
    },

    /// Fall completed; armed challenges are cancelled.
    StasisStarted {
        /// When stasis began.
        timestamp: DateTime<Utc>,
        /// Cycle counter at stasis.
        cycle: u32,
    },

    /// A reaction challenge was armed.
    ChallengeSpawned {
        /// When the challenge was armed.
        timestamp: DateTime<Utc>,
        /// Challenge id.
        id: ChallengeId,
    },

    /// A reaction challenge resolved.
    ChallengeResolved {
        /// When the challenge resolved.
        timestamp: DateTime<Utc>,
        /// Challenge id.
        id: ChallengeId,
        /// Final verdict.
        verdict: Verdict,
        /// Elapsed time at resolution in milliseconds.
        elapsed_ms: u64,
        /// Input that resolved it; absent on timeout.
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<InputKind>,
    },

    /// Armed challenges were dropped without a report.
    ChallengesCancelled {
        /// When the challenges were dropped.
        timestamp: DateTime<Utc>,
        /// Dropped challenge ids.
        ids: Vec<ChallengeId>,
    },

    /// The game reached a terminal outcome.
    GameOver {
        /// When the game ended.
        timestamp: DateTime<Utc>,
        /// Won or lost.
        outcome: GameOutcome,
        /// Final cycle counter.
        cycle: u32,
    },
}

impl Event {
    /// Builds a `ChallengeResolved` event from an outcome.
    #[must_use]
    pub fn challenge_resolved(outcome: &ChallengeOutcome) -> Self {
        Self::ChallengeResolved {
            timestamp: Utc::now(),
            id: outcome.id,
            verdict: outcome.verdict,
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            input: outcome.input,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as a single JSON line, and flushes the underlying
/// writer. Serialization or I/O failures are dropped; a broken event sink
/// never stops the game.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that appends to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Flushes the underlying writer.
    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
