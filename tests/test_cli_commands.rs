mod common;

use common::{event_types, fixture, read_events, run_command, started_phases};
use tempfile::TempDir;

// ============================================================================
// version command
// ============================================================================

#[test]
fn version_human() {
    let output = run_command(&["version"]);
    assert!(
        output.status.success(),
        "version should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("phaseloop "), "unexpected output: {stdout}");
    assert!(stdout.contains('.'), "should contain a version number: {stdout}");
}

#[test]
fn version_json() {
    let output = run_command(&["version", "--format", "json"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("version JSON should be valid");
    assert_eq!(parsed["name"], "phaseloop");
    assert!(parsed.get("version").is_some(), "missing version: {stdout}");
}

// ============================================================================
// validate command
// ============================================================================

#[test]
fn validate_valid_fixtures() {
    let win = fixture("fast_win.yaml");
    let loss = fixture("fast_loss.yaml");
    let output = run_command(&[
        "--quiet",
        "validate",
        win.to_str().unwrap(),
        loss.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "validate should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("ok: ").count(), 2, "{stdout}");
    // branch_threshold 1.0 can never be won.
    assert!(stdout.contains("warning:"), "{stdout}");
}

#[test]
fn validate_strict_fails_on_warnings() {
    let loss = fixture("fast_loss.yaml");
    let output = run_command(&["--quiet", "validate", "--strict", loss.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn validate_invalid_reports_every_issue() {
    let path = fixture("invalid.yaml");
    let output = run_command(&["--quiet", "validate", "--format", "json", path.to_str().unwrap()]);
    assert_eq!(
        output.status.code(),
        Some(2),
        "config errors exit with CONFIG_ERROR"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let file = &parsed["files"][0];
    assert_eq!(file["valid"], false);
    let errors: Vec<&str> = file["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e.as_str())
        .collect();
    for path in [
        "cycle.cycles_before_game_over",
        "cycle.branch_threshold",
        "phases.fall",
        "challenge.max_active",
    ] {
        assert!(
            errors.iter().any(|e| e.contains(path)),
            "missing {path} in {errors:?}"
        );
    }
}

#[test]
fn validate_rejects_unknown_fields() {
    let path = fixture("unknown_field.yaml");
    let output = run_command(&["--quiet", "validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cycles_before_gameover"), "{stdout}");
}

#[test]
fn validate_missing_file() {
    let output = run_command(&["--quiet", "validate", "/nonexistent/loop.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn validate_requires_files() {
    let output = run_command(&["validate"]);
    assert!(!output.status.success());
}

// ============================================================================
// run command
// ============================================================================

#[test]
fn run_to_a_win_with_autoplay() {
    let dir = TempDir::new().unwrap();
    let events_path = dir.path().join("events.jsonl");
    let config = fixture("fast_win.yaml");

    let output = run_command(&[
        "--quiet",
        "run",
        "--config",
        config.to_str().unwrap(),
        "--no-input",
        "--autoplay",
        "15ms",
        "--events-file",
        events_path.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "run should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("outcome=won"), "{stdout}");

    let events = read_events(&events_path);
    let types = event_types(&events);
    assert_eq!(types.first(), Some(&"SessionStarted"));
    assert_eq!(types.last(), Some(&"SessionStopped"));
    assert_eq!(
        started_phases(&events),
        ["fall", "repair", "resolve", "prepare"]
    );

    let sequences: Vec<u64> = events
        .iter()
        .map(|e| e["sequence"].as_u64().unwrap())
        .collect();
    assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));

    let game_over = events.iter().find(|e| e["type"] == "GameOver").unwrap();
    assert_eq!(game_over["outcome"], "won");
    assert_eq!(game_over["cycle"], 1);

    assert!(
        events
            .iter()
            .any(|e| e["type"] == "ChallengeResolved" && e["verdict"] == "success")
    );
}

#[test]
fn run_to_a_loss_at_threshold() {
    let dir = TempDir::new().unwrap();
    let events_path = dir.path().join("events.jsonl");
    let config = fixture("fast_loss.yaml");

    let output = run_command(&[
        "--quiet",
        "run",
        "--config",
        config.to_str().unwrap(),
        "--no-input",
        "--events-file",
        events_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("outcome=lost"), "{stdout}");
    assert!(stdout.contains("cycles=2"), "{stdout}");

    let events = read_events(&events_path);
    assert_eq!(
        started_phases(&events),
        ["fall", "prepare", "fall", "prepare", "fall"]
    );

    // Each fall ends in stasis; stasis always precedes the next phase.
    let types = event_types(&events);
    assert_eq!(types.iter().filter(|t| **t == "StasisStarted").count(), 3);

    let stopped = events.last().unwrap();
    assert_eq!(stopped["reason"], "game_over");
    assert_eq!(stopped["summary"]["outcome"], "lost");
}

#[test]
fn run_missing_config_fails() {
    let output = run_command(&["--quiet", "run", "--config", "/nonexistent/loop.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_rejects_bad_autoplay_delay() {
    let output = run_command(&["run", "--autoplay", "eventually"]);
    assert!(!output.status.success());
}
