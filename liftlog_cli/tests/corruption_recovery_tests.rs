//! Corruption recovery tests for liftlog.
//!
//! These tests verify the system can handle:
//! - A corrupted collection slot next to healthy ones
//! - Missing slots
//! - Bad backup bundles, including ones that repeat record ids

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("liftlog"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn add_exercise(data_dir: &std::path::Path, name: &str) -> String {
    let output = cli()
        .args(["exercise", "add", name])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output)
        .unwrap()
        .split_whitespace()
        .last()
        .unwrap()
        .to_string()
}

#[test]
fn test_corrupted_sessions_slot_keeps_exercises() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let squat = add_exercise(data_dir, "Squat");
    fs::write(data_dir.join("store/sessions.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted slot");

    cli()
        .args(["exercise", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(squat.as_str()))
        .stderr(predicate::str::contains("stored sessions could not be read"));

    cli()
        .args(["session", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions yet"));
}

#[test]
fn test_next_write_replaces_corrupted_slot() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    add_exercise(data_dir, "Squat");
    fs::write(data_dir.join("store/plans.json"), [0xffu8, 0x00, 0x13]).unwrap();

    add_exercise(data_dir, "Bench");

    let plans = fs::read_to_string(data_dir.join("store/plans.json")).unwrap();
    assert_eq!(plans.trim(), "[]");
    let exercises: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(data_dir.join("store/exercises.json")).unwrap())
            .unwrap();
    assert_eq!(exercises.as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_slot_is_empty() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    add_exercise(data_dir, "Squat");
    fs::remove_file(data_dir.join("store/exercises.json")).unwrap();

    cli()
        .args(["exercise", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No exercises yet"))
        .stderr(predicate::str::contains("could not be read").not());
}

#[test]
fn test_bad_bundle_is_rejected_without_changes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let bundle_path = data_dir.join("bad.json");

    let squat = add_exercise(data_dir, "Squat");
    fs::write(
        &bundle_path,
        r#"{"exercises":"W10=","sessions":"W10=","plans":"W10=","version":"9.9"}"#,
    )
    .unwrap();

    cli()
        .args(["import", bundle_path.to_str().unwrap()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure();

    let exercises = fs::read_to_string(data_dir.join("store/exercises.json")).unwrap();
    assert!(exercises.contains(&squat));
}

#[test]
fn test_bundle_with_duplicate_ids_leaves_store_untouched() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let bundle_path = data_dir.join("dup.json");

    add_exercise(data_dir, "Squat");
    let export = cli()
        .arg("export")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let snapshot = liftlog_core::import_bundle(&String::from_utf8(export).unwrap()).unwrap();
    let mut exercises = snapshot.exercises.clone();
    exercises.push(snapshot.exercises[0].clone());
    let bundle = liftlog_core::export_bundle(&exercises, &snapshot.sessions, &snapshot.plans)
        .unwrap()
        .to_json()
        .unwrap();
    fs::write(&bundle_path, bundle).unwrap();

    let before = fs::read(data_dir.join("store/exercises.json")).unwrap();

    cli()
        .args(["import", bundle_path.to_str().unwrap()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate id"));

    let after = fs::read(data_dir.join("store/exercises.json")).unwrap();
    assert_eq!(before, after);

    let listed: Vec<u8> = cli()
        .args(["exercise", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(listed).unwrap().matches("Squat").count(), 1);
}
