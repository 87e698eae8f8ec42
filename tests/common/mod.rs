//! Shared integration-test harness for running the `phaseloop` binary and
//! reading its JSONL event stream.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::Value;

/// Path to a file under `tests/fixtures`.
#[must_use]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs the binary to completion with the given arguments.
///
/// Stdin is closed, so `run` sees no player input.
#[allow(clippy::missing_panics_doc)]
pub fn run_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_phaseloop"))
        .args(args)
        .env_remove("PHASELOOP_SEED")
        .env_remove("PHASELOOP_CONFIG")
        .env_remove("PHASELOOP_EVENTS_FILE")
        .env_remove("PHASELOOP_LOG_LEVEL")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run phaseloop")
}

/// Parses a JSONL events file.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn read_events(path: &Path) -> Vec<Value> {
    let raw = std::fs::read_to_string(path).expect("events file should exist");
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid JSON: {e}\n{l}")))
        .collect()
}

/// The `type` tag of each event, in order.
#[must_use]
pub fn event_types(events: &[Value]) -> Vec<&str> {
    events.iter().filter_map(|e| e["type"].as_str()).collect()
}

/// Phases named by `PhaseStarted` events, in order.
#[must_use]
pub fn started_phases(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .filter(|e| e["type"] == "PhaseStarted")
        .filter_map(|e| e["phase"].as_str())
        .collect()
}
