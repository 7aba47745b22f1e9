//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, rejects bad input
//! before touching the network, and that `plan` works end to end.

#![allow(deprecated)] // cargo_bin deprecation — replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `capburn` binary.
fn capburn() -> Command {
    Command::cargo_bin("capburn").expect("binary 'capburn' should be built")
}

const TWO_CUES: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello world\n\n\
                        2\n00:00:04,500 --> 00:00:06,000\nSecond line\n";

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    capburn()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: capburn"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("captions"))
        .stdout(predicate::str::contains("burn"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn version_flag_shows_version() {
    capburn()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_args_shows_error() {
    capburn()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ─── run ─────────────────────────────────────────────────────────────────────

#[test]
fn run_without_url_is_usage_error() {
    capburn()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"))
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn run_rejects_invalid_url() {
    capburn()
        .args(["run", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn run_rejects_non_http_scheme() {
    capburn()
        .args(["run", "file:///etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported URL scheme"));
}

#[test]
fn run_help_lists_options() {
    capburn()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dir"))
        .stdout(predicate::str::contains("--lang"))
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn run_with_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    capburn()
        .args(["run", "https://example.com/watch?v=abc", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

// ─── plan ────────────────────────────────────────────────────────────────────

#[test]
fn plan_prints_render_plan_json() {
    let dir = tempfile::tempdir().unwrap();
    let srt = dir.path().join("clip.srt");
    std::fs::write(&srt, TWO_CUES).unwrap();

    let output = capburn()
        .arg("plan")
        .arg(&srt)
        .args(["--width", "1920", "--height", "1080"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let placements = plan["placements"].as_array().unwrap();
    assert_eq!(placements.len(), 2);
    assert_eq!(placements[0]["text"], "Hello world");
    assert_eq!(placements[0]["font_size"], 72);
    assert_eq!(placements[0]["box_width"], 1880);
    assert_eq!(placements[1]["start_offset"], 4.5);
    assert_eq!(plan["geometry"]["vertical_offset"], 960);
}

#[test]
fn plan_reports_malformed_captions() {
    let dir = tempfile::tempdir().unwrap();
    let srt = dir.path().join("broken.srt");
    std::fs::write(&srt, "1\n00:00:01,000 -> 00:00:03,000\nHello\n").unwrap();

    capburn()
        .arg("plan")
        .arg(&srt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed caption block #1 (line 2)"));
}

#[test]
fn plan_rejects_reversed_cue() {
    let dir = tempfile::tempdir().unwrap();
    let srt = dir.path().join("reversed.srt");
    std::fs::write(&srt, "7\n00:00:05,000 --> 00:00:02,000\nBackwards\n").unwrap();

    capburn()
        .arg("plan")
        .arg(&srt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("caption 7"));
}

#[test]
fn plan_missing_file_fails() {
    capburn()
        .args(["plan", "/nonexistent/captions.srt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
