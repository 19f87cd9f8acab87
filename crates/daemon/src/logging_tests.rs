// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn small_log_is_left_alone() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("fleetd.log");
    std::fs::write(&log, "short\n").unwrap();

    assert!(!rotate_if_needed(&log, 1024).unwrap());
    assert!(log.exists());
    assert!(!rotated_path(&log, 1).exists());
}

#[test]
fn missing_log_is_not_an_error() {
    let dir = tempdir().unwrap();
    assert!(!rotate_if_needed(&dir.path().join("fleetd.log"), 10).unwrap());
}

#[test]
fn oversized_log_shifts_generations() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("fleetd.log");
    std::fs::write(&log, "current log line\n").unwrap();
    std::fs::write(rotated_path(&log, 1), "gen1").unwrap();
    std::fs::write(rotated_path(&log, 2), "gen2").unwrap();
    std::fs::write(rotated_path(&log, 3), "gen3").unwrap();

    assert!(rotate_if_needed(&log, 4).unwrap());

    assert!(!log.exists());
    assert_eq!(
        std::fs::read_to_string(rotated_path(&log, 1)).unwrap(),
        "current log line\n"
    );
    assert_eq!(std::fs::read_to_string(rotated_path(&log, 2)).unwrap(), "gen1");
    assert_eq!(std::fs::read_to_string(rotated_path(&log, 3)).unwrap(), "gen2");
    assert!(!rotated_path(&log, 4).exists());
}

#[test]
fn startup_marker_appends_with_pid() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("nested").join("fleetd.log");

    write_startup_marker(&log).unwrap();
    write_startup_marker(&log).unwrap();

    let text = std::fs::read_to_string(&log).unwrap();
    let expected = format!("{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id());
    assert_eq!(text.lines().filter(|l| *l == expected).count(), 2);
}

#[test]
fn startup_error_is_appended() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("fleetd.log");
    write_startup_error(&log, &LifecycleError::NoStateDir);
    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.starts_with("ERROR Failed to start fleetd:"));
}
