//! CLI Integration Tests
//!
//! These tests run the `gslog` binary end-to-end against a temporary log
//! directory.

use std::fs;

use assert_cmd::Command;
use chrono::Local;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a CLI command writing to a temporary log directory
fn cli_cmd(log_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gslog").expect("Failed to find gslog binary");
    cmd.env_remove("GSLOG_DIR")
        .env_remove("GSLOG_LEVEL")
        .env_remove("GSLOG_COMPRESS_DAY")
        .env_remove("RUST_LOG");
    cmd.arg("--log-dir").arg(log_dir.path());
    cmd
}

fn today_token() -> String {
    Local::now().format("%Y%m%d").to_string()
}

fn log_files(log_dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(log_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".log"))
        .collect();
    names.sort();
    names
}

// ============================================================================
// Emit Command Tests
// ============================================================================

#[test]
fn test_emit_writes_log_file() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["emit", "--name", "app", "--desc", "main", "first", "second"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 message(s)"));

    let expected = format!("app_main_{}_0.log", today_token());
    assert_eq!(log_files(&log_dir), vec![expected.clone()]);

    let content = fs::read_to_string(log_dir.path().join(expected)).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("(main.rs:"));
    assert!(lines[0].ends_with(":[I] cli -- first"));
    assert!(lines[1].ends_with(":[I] cli -- second"));
}

#[test]
fn test_emit_with_level_and_logger() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args([
            "emit", "-n", "db", "--logger", "pool", "--level", "error", "exhausted",
        ])
        .assert()
        .success();

    let file = log_dir
        .path()
        .join(format!("db_main_{}_0.log", today_token()));
    let content = fs::read_to_string(file).unwrap();
    assert!(content.trim_end().ends_with(":[E] pool -- exhausted"));
}

#[test]
fn test_emit_rotates_on_cut_size() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["--cut-size", "10", "emit", "--name", "app", "one", "two", "three"])
        .assert()
        .success();

    let today = today_token();
    assert_eq!(
        log_files(&log_dir),
        vec![
            format!("app_main_{}_0.log", today),
            format!("app_main_{}_1.log", today),
            format!("app_main_{}_2.log", today),
        ]
    );
}

#[test]
fn test_emit_rejects_name_with_underscore() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["emit", "--name", "bad_name", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot create file sink"));
}

#[test]
fn test_emit_rejects_unknown_level() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["emit", "--name", "app", "--level", "loud", "hello"])
        .assert()
        .failure();
}

#[test]
fn test_emit_respects_level_environment() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .env("GSLOG_LEVEL", "error")
        .args(["emit", "--name", "app", "--level", "debug", "quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No messages written"));

    assert!(log_files(&log_dir).is_empty());
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_empty_directory() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No log files"));
}

#[test]
fn test_list_shows_parsed_names() {
    let log_dir = TempDir::new().unwrap();
    fs::write(log_dir.path().join("app_worker_pool_20240601_3.log"), "x").unwrap();

    cli_cmd(&log_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-06-01"))
        .stdout(predicate::str::contains("worker_pool"))
        .stdout(predicate::str::contains("#3"));
}

// ============================================================================
// Compress / Uncompress Command Tests
// ============================================================================

#[test]
fn test_compress_and_uncompress_round_trip() {
    let log_dir = TempDir::new().unwrap();
    let old = log_dir.path().join("app_main_20200101_0.log");
    fs::write(&old, "from long ago\n").unwrap();

    let today = today_token();
    cli_cmd(&log_dir)
        .args(["compress", "--days", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Archived 1 file(s)"))
        .stdout(predicate::str::contains(format!("{}.tar.gz", today)));

    assert!(!old.exists());
    assert!(log_dir.path().join(format!("{}.tar.gz", today)).exists());

    cli_cmd(&log_dir)
        .args(["uncompress", &today])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 file(s)"));

    assert_eq!(fs::read_to_string(&old).unwrap(), "from long ago\n");
    assert!(!log_dir.path().join(format!("{}.tar.gz", today)).exists());
}

#[test]
fn test_compress_nothing_to_archive() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["compress", "--days", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to archive"));
}

#[test]
fn test_compress_filters_by_name() {
    let log_dir = TempDir::new().unwrap();
    fs::write(log_dir.path().join("app_main_20200101_0.log"), "a").unwrap();
    fs::write(log_dir.path().join("db_main_20200101_0.log"), "b").unwrap();

    cli_cmd(&log_dir)
        .args(["compress", "--name", "db", "--days", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db_main_20200101_0.log"));

    assert_eq!(log_files(&log_dir), vec!["app_main_20200101_0.log"]);
}

#[test]
fn test_compress_out_of_range_days_is_an_error() {
    let log_dir = TempDir::new().unwrap();
    fs::write(log_dir.path().join("app_main_20200101_0.log"), "kept").unwrap();

    cli_cmd(&log_dir)
        .args(["compress", "--days", "200000000000000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("out of range"));

    assert_eq!(log_files(&log_dir), vec!["app_main_20200101_0.log"]);
}

#[test]
fn test_uncompress_invalid_day() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["uncompress", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("yesterday"));
}

#[test]
fn test_uncompress_missing_archive() {
    let log_dir = TempDir::new().unwrap();

    cli_cmd(&log_dir)
        .args(["uncompress", "20200101"])
        .assert()
        .failure();
}
