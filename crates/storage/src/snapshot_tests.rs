// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::test_support::{tenant_failed_event, tenant_registered_event};
use std::io::Write;
use tempfile::tempdir;

fn sample_state() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.apply_event(&tenant_registered_event("acme"));
    state.apply_event(&tenant_failed_event("acme", "bad token"));
    state
}

#[test]
fn save_then_load_preserves_tenants() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    Snapshot::new(7, sample_state()).save(&path).unwrap();
    let loaded = Snapshot::load(&path).unwrap().unwrap();

    assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(loaded.seq, 7);
    let tenant = loaded.state.tenant("acme").unwrap();
    assert_eq!(tenant.error_count, 1);
    assert_eq!(tenant.last_error.as_deref(), Some("bad token"));
}

#[test]
fn missing_file_loads_as_none() {
    let dir = tempdir().unwrap();
    assert!(Snapshot::load(&dir.path().join("nope.json")).unwrap().is_none());
}

#[test]
fn save_leaves_no_tmp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/state.json");

    Snapshot::new(7, sample_state()).save(&path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn corrupt_snapshot_is_moved_to_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut f = File::create(&path).unwrap();
    f.write_all(b"{not json").unwrap();
    drop(f);

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(!path.exists());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn newer_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut snapshot = Snapshot::new(0, MaterializedState::default());
    snapshot.version = CURRENT_SNAPSHOT_VERSION + 1;
    snapshot.save(&path).unwrap();

    let err = Snapshot::load(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::Version(v) if v == CURRENT_SNAPSHOT_VERSION + 1));
    assert!(path.exists());
}

#[test]
fn bak_rotation_keeps_three() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    for _ in 0..4 {
        std::fs::write(&path, b"garbage").unwrap();
        Snapshot::load(&path).unwrap();
    }

    assert!(path.with_extension("bak").exists());
    assert!(path.with_extension("bak.2").exists());
    assert!(path.with_extension("bak.3").exists());
    assert!(!path.with_extension("bak.4").exists());
}
