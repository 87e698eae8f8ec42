//! Configuration schema types
//!
//! These types are deserialized from YAML configuration files. Every
//! section and field is optional; omitted values take the defaults below.
//!
//! ```yaml
//! cycle:
//!   cycles_before_game_over: 3
//!   settle_delay: 0s
//!   branch_threshold: 0.5
//!   seed: 42
//! phases: { fall: 2, repair: 1, resolve: 1, prepare: 1 }
//! pulse:
//!   duration: 4s
//!   overrides: { fall: 6s }
//! challenge:
//!   neutral_window: 1.2s
//!   reaction_window: 0.8s
//!   spawn_interval: 3s
//!   frame: 16ms
//!   max_active: 4
//!   accept_pointer: true
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::challenge::{
    DEFAULT_MAX_ACTIVE, DEFAULT_NEUTRAL_WINDOW, DEFAULT_REACTION_WINDOW, DEFAULT_SPAWN_INTERVAL,
};
use crate::phase::{DEFAULT_BRANCH_THRESHOLD, DEFAULT_CYCLES_BEFORE_GAME_OVER, Phase, PhaseDurations};

use super::duration::ConfigDuration;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a game loop session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Cycle counting and branch drawing
    pub cycle: CycleConfig,

    /// Pulse counts per phase
    pub phases: PhasesConfig,

    /// Pulse lengths
    pub pulse: PulseConfig,

    /// Reaction challenge tuning
    pub challenge: ChallengeConfig,
}

// ============================================================================
// Cycle
// ============================================================================

/// Cycle counting and branch drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Completed cycles after which the game must end
    pub cycles_before_game_over: u32,

    /// Wait before the first Fall
    pub settle_delay: ConfigDuration,

    /// A branch flag is set when its uniform draw exceeds this value
    pub branch_threshold: f64,

    /// Seed for branch draws; drawn from entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycles_before_game_over: DEFAULT_CYCLES_BEFORE_GAME_OVER,
            settle_delay: ConfigDuration::default(),
            branch_threshold: DEFAULT_BRANCH_THRESHOLD,
            seed: None,
        }
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Pulse counts per timed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhasesConfig {
    /// Pulses in Fall
    pub fall: u32,
    /// Pulses in Repair
    pub repair: u32,
    /// Pulses in Resolve
    pub resolve: u32,
    /// Pulses in Prepare
    pub prepare: u32,
}

impl PhasesConfig {
    /// Pulse count configured for `phase`; `None` for Paused.
    #[must_use]
    pub const fn get(&self, phase: Phase) -> Option<u32> {
        match phase {
            Phase::Paused => None,
            Phase::Fall => Some(self.fall),
            Phase::Repair => Some(self.repair),
            Phase::Resolve => Some(self.resolve),
            Phase::Prepare => Some(self.prepare),
        }
    }
}

impl Default for PhasesConfig {
    fn default() -> Self {
        let d = PhaseDurations::default();
        Self {
            fall: d.pulses(Phase::Fall),
            repair: d.pulses(Phase::Repair),
            resolve: d.pulses(Phase::Resolve),
            prepare: d.pulses(Phase::Prepare),
        }
    }
}

impl From<PhasesConfig> for PhaseDurations {
    fn from(c: PhasesConfig) -> Self {
        Self::new(c.fall, c.repair, c.resolve, c.prepare)
    }
}

// ============================================================================
// Pulse
// ============================================================================

/// Pulse lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PulseConfig {
    /// Base pulse length for every phase
    pub duration: ConfigDuration,

    /// Per-phase pulse lengths
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<Phase, ConfigDuration>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            duration: ConfigDuration::from_secs(4),
            overrides: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Challenge
// ============================================================================

/// Reaction challenge tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChallengeConfig {
    /// Leading window where input is too early
    pub neutral_window: ConfigDuration,

    /// Trailing window where input succeeds
    pub reaction_window: ConfigDuration,

    /// Time between spawns during Fall
    pub spawn_interval: ConfigDuration,

    /// Frame length used to tick challenges
    pub frame: ConfigDuration,

    /// Cap on simultaneously armed challenges
    pub max_active: usize,

    /// Whether pointer presses are delivered
    pub accept_pointer: bool,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            neutral_window: ConfigDuration(DEFAULT_NEUTRAL_WINDOW),
            reaction_window: ConfigDuration(DEFAULT_REACTION_WINDOW),
            spawn_interval: ConfigDuration(DEFAULT_SPAWN_INTERVAL),
            frame: ConfigDuration::from_millis(16),
            max_active: DEFAULT_MAX_ACTIVE,
            accept_pointer: true,
        }
    }
}
