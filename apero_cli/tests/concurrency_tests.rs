//! Concurrency tests for the apero binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the drink log simultaneously (file locking)
//! - Read the log while it is being written
//! - Remove drinks while others are being added
//! - Save the profile repeatedly without corrupting it

use assert_cmd::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("apero"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_sequential_drink_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        cli()
            .args(["drink", "add", "--preset", "beer"])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    let log = std::fs::read_to_string(data_dir.join("drinks.jsonl")).expect("Failed to read log");
    assert_eq!(log.lines().count(), 5);
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .args(["profile", "set", "--sex", "female", "--weight", "60"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let data_dir_reader = data_dir.clone();
    let reader = thread::spawn(move || {
        for _ in 0..3 {
            cli()
                .arg("status")
                .arg("--data-dir")
                .arg(&data_dir_reader)
                .assert()
                .success();
        }
    });

    for _ in 0..3 {
        cli()
            .args(["drink", "add", "--preset", "wine"])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    reader.join().expect("Reader thread panicked");

    let log = std::fs::read_to_string(data_dir.join("drinks.jsonl")).expect("Failed to read log");
    assert_eq!(log.lines().count(), 3);
}

#[test]
fn test_no_log_corruption_under_load() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 5));
                cli()
                    .args(["drink", "add", "--preset", "pastis"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let log = std::fs::read_to_string(data_dir.join("drinks.jsonl")).expect("Failed to read log");

    let mut valid_count = 0;
    for line in log.lines() {
        if line.is_empty() {
            continue;
        }
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "Log contains invalid JSON line: {}", line);
        valid_count += 1;
    }

    assert_eq!(valid_count, 10, "Expected 10 valid drinks in log");
}

/// Extract the drink id from "✓ Logged <name> (<id>)"
fn logged_id(stdout: &[u8]) -> String {
    let out = String::from_utf8_lossy(stdout);
    let open = out.rfind('(').expect("No id in output");
    let close = out.rfind(')').expect("No id in output");
    out[open + 1..close].to_string()
}

#[test]
fn test_adds_survive_concurrent_removals() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let ids: Vec<String> = (0..5)
        .map(|_| {
            let output = cli()
                .args(["drink", "add", "--preset", "beer"])
                .arg("--data-dir")
                .arg(&data_dir)
                .output()
                .expect("Failed to run apero");
            assert!(output.status.success());
            logged_id(&output.stdout)
        })
        .collect();

    let data_dir_remover = data_dir.clone();
    let remover = thread::spawn(move || {
        for id in ids {
            cli()
                .args(["drink", "remove", id.as_str()])
                .arg("--data-dir")
                .arg(&data_dir_remover)
                .timeout(Duration::from_secs(10))
                .assert()
                .success();
        }
    });

    for _ in 0..5 {
        cli()
            .args(["drink", "add", "--preset", "whisky"])
            .arg("--data-dir")
            .arg(&data_dir)
            .timeout(Duration::from_secs(10))
            .assert()
            .success();
    }

    remover.join().expect("Remover thread panicked");

    let log = std::fs::read_to_string(data_dir.join("drinks.jsonl")).expect("Failed to read log");
    let names: Vec<String> = log
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| {
            let parsed: serde_json::Value =
                serde_json::from_str(l).expect("Log contains invalid JSON");
            parsed["name"].as_str().unwrap_or_default().to_string()
        })
        .collect();

    assert_eq!(names.len(), 5, "Every added whisky must survive: {:?}", names);
    assert!(names.iter().all(|n| n == "Whisky"), "Unexpected drinks: {:?}", names);
}

#[test]
fn test_profile_repeated_updates() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for weight in ["70", "71", "72"] {
        cli()
            .args(["profile", "set", "--sex", "male", "--weight", weight])
            .arg("--data-dir")
            .arg(&data_dir)
            .timeout(Duration::from_secs(10))
            .assert()
            .success();
    }

    let contents =
        std::fs::read_to_string(data_dir.join("profile.json")).expect("Failed to read profile");
    let parsed: serde_json::Value =
        serde_json::from_str(&contents).expect("Profile contains invalid JSON");
    assert_eq!(parsed["weight_kg"], serde_json::json!(72.0));
}
