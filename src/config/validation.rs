//! Configuration validation
//!
//! Semantic checks on a deserialized [`LoopConfig`]. The validator
//! collects every issue instead of stopping at the first one.

use std::time::Duration;

use crate::config::duration::ConfigDuration;
use crate::config::schema::LoopConfig;
use crate::error::{Severity, ValidationIssue};
use crate::phase::Phase;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &LoopConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_cycle(config);
        self.validate_phases(config);
        self.validate_pulse(config);
        self.validate_challenge(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_cycle(&mut self, config: &LoopConfig) {
        let cycle = &config.cycle;

        if cycle.cycles_before_game_over == 0 {
            self.add_error("cycle.cycles_before_game_over", "must be at least 1");
        }

        let threshold = cycle.branch_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            self.add_error(
                "cycle.branch_threshold",
                &format!("must be between 0 and 1, got {threshold}"),
            );
        } else if (threshold - 1.0).abs() < f64::EPSILON {
            self.add_warning(
                "cycle.branch_threshold",
                "threshold of 1 means branch flags are never set; the game can never be won",
            );
        }
    }

    fn validate_phases(&mut self, config: &LoopConfig) {
        for phase in Phase::TIMED {
            if config.phases.get(phase) == Some(0) {
                self.add_error(&format!("phases.{phase}"), "pulse count must be at least 1");
            }
        }
    }

    fn validate_pulse(&mut self, config: &LoopConfig) {
        self.require_positive("pulse.duration", config.pulse.duration);

        for (phase, duration) in &config.pulse.overrides {
            let path = format!("pulse.overrides.{phase}");
            if *phase == Phase::Paused {
                self.add_error(&path, "paused has no pulses and cannot be overridden");
            } else {
                self.require_positive(&path, *duration);
            }
        }
    }

    fn validate_challenge(&mut self, config: &LoopConfig) {
        let challenge = &config.challenge;

        self.require_positive("challenge.neutral_window", challenge.neutral_window);
        self.require_positive("challenge.reaction_window", challenge.reaction_window);
        self.require_positive("challenge.spawn_interval", challenge.spawn_interval);
        self.require_positive("challenge.frame", challenge.frame);

        if challenge.max_active == 0 {
            self.add_error("challenge.max_active", "must be at least 1");
        }

        if !challenge.frame.0.is_zero() && challenge.frame.0 > challenge.reaction_window.0 {
            self.add_warning(
                "challenge.frame",
                &format!(
                    "frame ({}) is longer than the reaction window ({}); presses may skip the window",
                    challenge.frame, challenge.reaction_window
                ),
            );
        }

        let Some(lifetime) = challenge
            .neutral_window
            .0
            .checked_add(challenge.reaction_window.0)
        else {
            self.add_error(
                "challenge.reaction_window",
                "neutral and reaction windows together are out of range",
            );
            return;
        };
        let fall = config
            .pulse
            .overrides
            .get(&Phase::Fall)
            .copied()
            .unwrap_or(config.pulse.duration)
            .0
            .saturating_mul(config.phases.fall);
        if fall > Duration::ZERO && lifetime > fall {
            self.add_warning(
                "challenge",
                "challenges outlive the fall and will always be cancelled before resolving",
            );
        }
    }

    fn require_positive(&mut self, path: &str, value: ConfigDuration) {
        if value.0.is_zero() {
            self.add_error(path, "duration must be greater than zero");
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
