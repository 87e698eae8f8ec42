//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check against [`ConfigLimits`]
//! 2. YAML parsing
//! 3. Deserialization to [`LoopConfig`]
//! 4. Environment overrides (`PHASELOOP_SEED`)
//! 5. Validation
//! 6. Conversion to typed [`Settings`]

use std::path::Path;
use std::time::Duration;

use serde_yaml::Value;
use tracing::debug;

use crate::challenge::{ChallengeWindows, CoordinatorSettings};
use crate::config::schema::LoopConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;
use crate::phase::PhaseDurations;
use crate::timing::PulseTrack;

/// Environment variable overriding `cycle.seed`.
pub const SEED_ENV: &str = "PHASELOOP_SEED";

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,

    /// Raw value of the seed override, if set.
    pub seed_override: Option<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            config_limits: ConfigLimits::default(),
            seed_override: std::env::var(SEED_ENV).ok(),
        }
    }
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: u64,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("PHASELOOP_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration, overrides applied.
    pub config: LoopConfig,

    /// Typed settings derived from `config`.
    pub settings: Settings,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} (at {location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Everything a session needs, in runtime types.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Pulse counts per phase
    pub durations: PhaseDurations,
    /// Cycle threshold
    pub cycles_before_game_over: u32,
    /// Wait before the first Fall
    pub settle_delay: Duration,
    /// Branch draw threshold
    pub branch_threshold: f64,
    /// Branch seed; entropy when `None`
    pub seed: Option<u64>,
    /// Pulse lengths
    pub pulse: PulseTrack,
    /// Coordinator tuning
    pub challenge: CoordinatorSettings,
    /// Frame length for challenge ticks
    pub frame: Duration,
}

impl From<&LoopConfig> for Settings {
    fn from(config: &LoopConfig) -> Self {
        let pulse = config
            .pulse
            .overrides
            .iter()
            .fold(PulseTrack::new(config.pulse.duration.0), |track, (phase, d)| {
                track.with_override(*phase, d.0)
            });

        let c = &config.challenge;
        Self {
            durations: config.phases.into(),
            cycles_before_game_over: config.cycle.cycles_before_game_over,
            settle_delay: config.cycle.settle_delay.0,
            branch_threshold: config.cycle.branch_threshold,
            seed: config.cycle.seed,
            pulse,
            challenge: CoordinatorSettings {
                windows: ChallengeWindows::new(c.neutral_window.0, c.reaction_window.0),
                spawn_interval: c.spawn_interval.0,
                max_active: c.max_active,
                accept_pointer: c.accept_pointer,
            },
            frame: c.frame.0,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&LoopConfig::default())
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads, validates, and converts a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - YAML parsing or deserialization fails
    /// - The seed override is not an unsigned integer
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        if metadata.len() > limit {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let result = self.parse(&raw, path)?;
        debug!(path = %path.display(), "configuration parsed");
        Ok(result)
    }

    /// Loads configuration from YAML text. No size limit is applied.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus file access.
    pub fn load_from_str(&self, yaml: &str) -> Result<LoadResult, ConfigError> {
        self.parse(yaml, Path::new("<string>"))
    }

    fn parse(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let root: Value = serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "Configuration file is empty".to_string(),
            });
        }

        let config: LoopConfig =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        self.finish(config, &path.display().to_string())
    }

    /// Built-in defaults with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed override is not an unsigned integer.
    pub fn defaults(&self) -> Result<LoadResult, ConfigError> {
        self.finish(LoopConfig::default(), "<defaults>")
    }

    fn finish(&self, mut config: LoopConfig, origin: &str) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        if let Some(raw) = &self.options.seed_override {
            let seed = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                field: SEED_ENV.to_string(),
                value: raw.clone(),
                expected: "an unsigned 64-bit integer".to_string(),
            })?;
            if config.cycle.seed.is_some_and(|s| s != seed) {
                warnings.push(LoadWarning {
                    message: format!("seed overridden by {SEED_ENV}={seed}"),
                    location: Some("cycle.seed".to_string()),
                });
            }
            config.cycle.seed = Some(seed);
        }

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        let settings = Settings::from(&config);
        Ok(LoadResult {
            config,
            settings,
            warnings,
        })
    }
}

/// Reads an environment variable, falling back to `default` when unset
/// or unparsable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
