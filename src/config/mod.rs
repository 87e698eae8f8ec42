//! Configuration module
//!
//! Loads and validates `phaseloop` configuration files: cycle threshold,
//! pulse counts and lengths, and reaction challenge tuning.

pub mod duration;
pub mod loader;
pub mod schema;
pub mod validation;

pub use duration::{ConfigDuration, DurationError, format_duration, parse_duration};
pub use loader::{
    ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions, SEED_ENV, Settings,
};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
