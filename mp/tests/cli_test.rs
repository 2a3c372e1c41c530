//! End-to-end tests for the mp binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = "logging:\n  format: text\n  level: warn\n";

fn mp(dir: &Path) -> Command {
    let config = dir.join("mediaprogress.yml");
    if !config.exists() {
        fs::write(&config, CONFIG).unwrap();
    }
    let mut cmd = Command::cargo_bin("mp").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config)
        .arg("--store")
        .arg(dir.join("store.db"));
    cmd
}

#[test]
fn test_batch_then_partial_key() {
    let temp = TempDir::new().unwrap();

    mp(temp.path())
        .args(["insert", "batch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user_2#VIDEO#title_4#media_1"));

    mp(temp.path())
        .args(["read", "partialKey"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"media_2\""))
        .stdout(predicate::str::contains("\"milliseconds\":6666666666"))
        .stdout(predicate::str::contains("media_3").not());
}

#[test]
fn test_read_one_after_delete_fails() {
    let temp = TempDir::new().unwrap();

    mp(temp.path()).args(["insert", "batch"]).assert().success();
    mp(temp.path())
        .args(["read", "one"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"media_id\":\"media_1\""));

    mp(temp.path())
        .arg("delete")
        .assert()
        .success()
        .stdout(predicate::str::contains("user_1#VIDEO#title_1#media_1"));

    mp(temp.path())
        .args(["read", "one"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No progress stored at user_1#VIDEO#title_1#media_1"));
}

#[test]
fn test_insert_conditional_skips_second_write() {
    let temp = TempDir::new().unwrap();

    mp(temp.path())
        .args(["insert", "conditional"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied"))
        .stdout(predicate::str::contains("Skipped"));
}

#[test]
fn test_memory_store_starts_empty() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("mediaprogress.yml");
    fs::write(&config, CONFIG).unwrap();

    Command::cargo_bin("mp")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["--memory", "read", "one"])
        .assert()
        .failure();

    Command::cargo_bin("mp")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["--memory", "read", "multiple"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_unknown_example_is_usage_error() {
    let temp = TempDir::new().unwrap();

    mp(temp.path()).args(["insert", "many"]).assert().failure().code(2);
    mp(temp.path()).arg("read").assert().failure();
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("mediaprogress.yml"), "timeouts:\n  read-ms: 0\n").unwrap();

    mp(temp.path())
        .args(["read", "one"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
