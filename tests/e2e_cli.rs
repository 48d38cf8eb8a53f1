//! CLI end-to-end tests
//!
//! Tests for the timeshift command-line interface.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the timeshift binary
#[allow(deprecated)]
fn timeshift_cmd() -> Command {
    Command::cargo_bin("timeshift").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    timeshift_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    timeshift_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeshift"));
}

#[test]
fn test_cli_inspect_lists_records() {
    let dir = tempdir().unwrap();
    let file = common::write_chunk(dir.path(), "a.chunk", &[0, 40_000, 80_000]);

    timeshift_cmd()
        .args(["inspect"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Records: 3 (1 key frames)"))
        .stdout(predicate::str::contains("key_frame"))
        .stdout(predicate::str::contains("80000"));
}

#[test]
fn test_cli_inspect_json() {
    let dir = tempdir().unwrap();
    let file = common::write_chunk(dir.path(), "a.chunk", &[0, 40_000]);

    let output = timeshift_cmd()
        .args(["inspect", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["record_count"], 2);
    assert_eq!(json["byte_len"], 56);
    assert_eq!(json["records"][1]["offset"], 28);
    assert!(json["tail"].is_null());
}

#[test]
fn test_cli_inspect_reports_partial_record() {
    let dir = tempdir().unwrap();
    let file = common::write_chunk(dir.path(), "a.chunk", &[0, 40_000]);
    let mut bytes = fs::read(&file).unwrap();
    bytes.truncate(bytes.len() - 5);
    fs::write(&file, bytes).unwrap();

    timeshift_cmd()
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Records: 1"))
        .stdout(predicate::str::contains("Partial record at offset 28"));
}

#[test]
fn test_cli_inspect_limit() {
    let dir = tempdir().unwrap();
    let timestamps: Vec<i64> = (0..20).map(|i| i * common::FRAME_US).collect();
    let file = common::write_chunk(dir.path(), "a.chunk", &timestamps);

    timeshift_cmd()
        .args(["inspect", "--limit", "5"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("... 15 more"));
}

#[test]
fn test_cli_inspect_missing_file() {
    timeshift_cmd()
        .args(["inspect", "/nonexistent/chunk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_verify_recorded_chain() {
    let dir = tempdir().unwrap();
    let files = common::record_chain(dir.path(), 25, 10);
    assert_eq!(files.len(), 3);

    timeshift_cmd()
        .arg("verify")
        .args(&files)
        .assert()
        .success()
        .stdout(predicate::str::contains("Chunks: 3  Samples: 25  Key frames: 3"))
        .stdout(predicate::str::contains("Chain is consistent"));
}

#[test]
fn test_cli_verify_json() {
    let dir = tempdir().unwrap();
    let files = common::record_chain(dir.path(), 12, 5);

    let output = timeshift_cmd()
        .args(["verify", "--json"])
        .args(&files)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["samples"], 12);
    assert_eq!(json["chunks"][2]["start_position_us"], 10 * common::FRAME_US);
    assert_eq!(json["violations"].as_array().unwrap().len(), 0);
}

#[test]
fn test_cli_verify_detects_backwards_timestamps() {
    let dir = tempdir().unwrap();
    let a = common::write_chunk(dir.path(), "a.chunk", &[0, 40_000]);
    let b = common::write_chunk(dir.path(), "b.chunk", &[80_000, 160_000, 120_000]);

    timeshift_cmd()
        .arg("verify")
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .stdout(predicate::str::contains("120000us after 160000us"))
        .stderr(predicate::str::contains("1 timestamp ordering violation"));
}

#[test]
fn test_cli_verify_rejects_wrong_order() {
    let dir = tempdir().unwrap();
    let files = common::record_chain(dir.path(), 10, 5);

    timeshift_cmd()
        .arg("verify")
        .arg(&files[1])
        .arg(&files[0])
        .assert()
        .failure()
        .stderr(predicate::str::contains("oldest first"));
}

#[test]
fn test_cli_validate_default_config() {
    let dir = tempdir().unwrap();
    timeshift_cmd()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_with_warnings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timeshift.toml");
    fs::write(&path, "[buffer]\nmax_sample_size = 0\n").unwrap();

    timeshift_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 warning(s)"))
        .stdout(predicate::str::contains("max_sample_size is 0"));
}

#[test]
fn test_cli_validate_invalid_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[buffer\n").unwrap();

    timeshift_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_cli_config_limits_sample_size() {
    let dir = tempdir().unwrap();
    let file = common::write_chunk(dir.path(), "a.chunk", &[0]);
    let config = dir.path().join("small.toml");
    fs::write(&config, "[buffer]\nmax_sample_size = 4\n").unwrap();

    timeshift_cmd()
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Corrupt record at offset 0"));
}
