//! Logging initialization for `phaseloop`.
//!
//! Structured logging via `tracing` with human-readable and JSON output
//! formats and an environment override via `PHASELOOP_LOG_LEVEL`.
//!
//! Verbosity only raises this crate's own events; dependencies stay at
//! `warn`. Session logs are emitted inside a `session` span whose `phase`
//! and `cycle` fields follow the engine, so every line carries them.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "PHASELOOP_LOG_LEVEL";

/// Log target of this crate's events.
const CRATE_TARGET: &str = "phaseloop";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Maps a verbosity level to a tracing directive string.
///
/// - 0 → `"warn"`
/// - 1 → `"info"`
/// - 2 → `"debug"`
/// - 3+ → `"trace"` (saturates)
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter used when `PHASELOOP_LOG_LEVEL` is unset.
///
/// `-v` flags raise only the `phaseloop` target.
#[must_use]
pub fn default_directive(verbosity: u8) -> String {
    match verbosity {
        0 => verbosity_to_directive(0).to_string(),
        v => format!("warn,{CRATE_TARGET}={}", verbosity_to_directive(v)),
    }
}

/// Initializes the global tracing subscriber on stderr.
///
/// If `PHASELOOP_LOG_LEVEL` is set it takes precedence over `verbosity`.
/// Uses `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let show_target = verbosity >= 2;

    let use_ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    match format {
        LogFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(use_ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
