//! A real manager driven through the `fleet` CLI, supervising real workers

use crate::prelude::*;

#[test]
fn empty_fleet_lists_nothing() {
    let manager = Manager::start();
    manager
        .fleet()
        .args(&["bots", "list"])
        .passes()
        .stdout_has("No bots registered");
}

#[test]
fn register_start_stop_round_trip() {
    let manager = Manager::start();

    manager
        .fleet()
        .args(&["bots", "register", "t1", "--token", "tok-1"])
        .passes()
        .stdout_eq("Registered t1\n");

    manager
        .fleet()
        .args(&["bots", "start", "t1"])
        .passes()
        .stdout_has("Started t1");

    let status = manager
        .fleet()
        .args(&["-o", "json", "bots", "status", "t1"])
        .passes()
        .json();
    assert_eq!(status["status"], "ACTIVE");
    assert_eq!(status["phase"], "RUNNING");
    assert_eq!(status["isRunning"], true);

    manager
        .fleet()
        .args(&["bots", "stop", "t1"])
        .passes()
        .stdout_has("Stopped t1");

    let audit = manager
        .fleet()
        .args(&["-o", "json", "bots", "audit", "t1"])
        .passes()
        .json();
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["TENANT_REGISTERED", "TENANT_STARTED", "TENANT_STOPPED"]
    );
    assert!(audit
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["userId"] == "ops"));
}

#[test]
fn stored_credential_is_never_printed() {
    let manager = Manager::start();
    manager
        .fleet()
        .args(&["bots", "register", "t2", "--token", "super-secret-token"])
        .passes();
    manager
        .fleet()
        .args(&["-o", "json", "bots", "list"])
        .passes()
        .stdout_lacks("super-secret-token");
    for file in ["tenants.json", "tenants.wal"] {
        let contents =
            std::fs::read_to_string(manager.state_dir.path().join(file)).unwrap_or_default();
        assert!(!contents.contains("super-secret-token"), "{file} leaks the token");
    }
}

#[test]
fn unknown_tenant_is_reported() {
    let manager = Manager::start();
    manager
        .fleet()
        .args(&["bots", "start", "ghost"])
        .fails()
        .stderr_has("HTTP 404");
}

#[test]
fn stopping_a_stopped_tenant_fails() {
    let manager = Manager::start();
    manager
        .fleet()
        .args(&["bots", "register", "t3", "--token", "tok-3"])
        .passes();
    manager
        .fleet()
        .args(&["bots", "stop", "t3"])
        .fails()
        .stderr_has("HTTP 400");
}

#[test]
fn wrong_secret_is_rejected() {
    let manager = Manager::start();
    manager
        .fleet()
        .env("MANAGER_HMAC_SECRET", "not-the-secret")
        .args(&["bots", "list"])
        .fails()
        .stderr_has("HTTP 401");
}
