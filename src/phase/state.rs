//! Phase and cycle state representation
//!
//! Plain data owned by the [`PhaseCycleEngine`](super::PhaseCycleEngine).
//! Nothing here mutates itself; the engine drives every field.

use serde::{Deserialize, Serialize};

/// A timed segment of the game loop.
///
/// `Paused` is the resting state: before the session starts, between a
/// phase completing and the next one starting, and after the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No phase active
    #[default]
    Paused,
    /// The world falls apart; reaction challenges spawn
    Fall,
    /// Damage from the fall is repaired
    Repair,
    /// Open issues are resolved
    Resolve,
    /// Preparation for the next fall; completes a cycle
    Prepare,
}

impl Phase {
    /// All phases that carry a pulse duration, in loop order.
    pub const TIMED: [Self; 4] = [Self::Fall, Self::Repair, Self::Resolve, Self::Prepare];

    /// Returns the lowercase name used in logs, metrics, and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::Fall => "fall",
            Self::Repair => "repair",
            Self::Resolve => "resolve",
            Self::Prepare => "prepare",
        }
    }

    /// Whether the phase's progress bar counts down (1 → 0).
    ///
    /// Only Fall fills forward.
    #[must_use]
    pub const fn counts_down(self) -> bool {
        matches!(self, Self::Repair | Self::Resolve | Self::Prepare)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pulse counts per timed phase.
///
/// Fixed at engine construction. Counts are validated to be at least one
/// by the config layer; [`PhaseDurations::new`] clamps zero up to one so
/// that a phase always lasts at least a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    fall: u32,
    repair: u32,
    resolve: u32,
    prepare: u32,
}

impl PhaseDurations {
    /// Creates durations from explicit pulse counts.
    #[must_use]
    pub fn new(fall: u32, repair: u32, resolve: u32, prepare: u32) -> Self {
        Self {
            fall: fall.max(1),
            repair: repair.max(1),
            resolve: resolve.max(1),
            prepare: prepare.max(1),
        }
    }

    /// Every phase lasts the same number of pulses.
    #[must_use]
    pub fn uniform(pulses: u32) -> Self {
        Self::new(pulses, pulses, pulses, pulses)
    }

    /// Returns the pulse count for `phase`; `Paused` lasts zero pulses.
    #[must_use]
    pub const fn pulses(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Paused => 0,
            Phase::Fall => self.fall,
            Phase::Repair => self.repair,
            Phase::Resolve => self.resolve,
            Phase::Prepare => self.prepare,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self::new(2, 1, 1, 1)
    }
}

/// Per-cycle branching flags, drawn once when Fall starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BranchDecision {
    /// Route through Repair after Fall
    pub needs_repair: bool,
    /// Route through Resolve after Fall or Repair
    pub needs_resolve: bool,
    /// Win at the end of Prepare (or at end-game evaluation)
    pub has_enough_knowledge: bool,
}

impl BranchDecision {
    /// Builds a decision from the three flags, in field order.
    #[must_use]
    pub const fn new(needs_repair: bool, needs_resolve: bool, has_enough_knowledge: bool) -> Self {
        Self {
            needs_repair,
            needs_resolve,
            has_enough_knowledge,
        }
    }
}

/// Terminal result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// Enough knowledge was gathered
    Won,
    /// The cycle threshold was reached without enough knowledge
    Lost,
}

impl GameOutcome {
    /// Returns the lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl std::fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable cycle record, owned exclusively by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleState {
    /// Active phase
    pub phase: Phase,
    /// Pulses left before the active phase completes
    pub pulses_remaining: u32,
    /// Pulse count the active phase started with
    pub pulses_total: u32,
    /// Completed-cycle counter; increments on entering Prepare
    pub current_cycle: u32,
    /// Cycle count at which the game must end
    pub cycles_before_game_over: u32,
    /// Set once the game reached a terminal state
    pub outcome: Option<GameOutcome>,
}

impl CycleState {
    /// Creates a paused state at cycle 0.
    #[must_use]
    pub const fn new(cycles_before_game_over: u32) -> Self {
        Self {
            phase: Phase::Paused,
            pulses_remaining: 0,
            pulses_total: 0,
            current_cycle: 0,
            cycles_before_game_over,
            outcome: None,
        }
    }

    /// Whether the cycle counter is still below the game-over threshold.
    #[must_use]
    pub const fn below_threshold(&self) -> bool {
        self.current_cycle < self.cycles_before_game_over
    }

    /// Whether the game has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}
