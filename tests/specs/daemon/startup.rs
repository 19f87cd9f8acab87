//! `fleetd` startup and argument handling

use crate::prelude::*;

#[test]
fn version_flag() {
    fleetd()
        .args(&["--version"])
        .passes()
        .stdout_eq(&format!("fleetd {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_names_required_secrets() {
    fleetd()
        .args(&["--help"])
        .passes()
        .stdout_has("MANAGER_API_KEY")
        .stdout_has("ENCRYPTION_KEY");
}

#[test]
fn unexpected_argument_fails() {
    fleetd()
        .args(&["--bogus"])
        .fails()
        .stderr_has("unexpected argument '--bogus'");
}

#[test]
fn missing_api_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    fleetd()
        .env("FLEET_STATE_DIR", dir.path())
        .env("MANAGER_HMAC_SECRET", HMAC_SECRET)
        .env("ENCRYPTION_KEY", ENCRYPTION_KEY)
        .fails()
        .stderr_has("missing required secret MANAGER_API_KEY");
}

#[test]
fn malformed_encryption_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    fleetd()
        .env("FLEET_STATE_DIR", dir.path())
        .env("MANAGER_API_KEY", API_KEY)
        .env("MANAGER_HMAC_SECRET", HMAC_SECRET)
        .env("ENCRYPTION_KEY", "not-hex")
        .fails()
        .stderr_has("invalid ENCRYPTION_KEY");
}

#[test]
fn second_instance_is_refused() {
    let manager = Manager::start();
    let output = manager_command(manager.state_dir.path(), free_port())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("fleetd is already running"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
