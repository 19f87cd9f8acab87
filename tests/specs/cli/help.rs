//! `fleet` help and static output

use crate::prelude::*;

#[test]
fn help_lists_command_groups() {
    fleet()
        .args(&["--help"])
        .passes()
        .stdout_has("bots")
        .stdout_has("config");
}

#[test]
fn version_prints_package_version() {
    fleet()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn bots_help_lists_lifecycle_commands() {
    let run = fleet().args(&["bots", "--help"]).passes();
    for cmd in ["register", "start", "stop", "restart", "reset-errors", "audit"] {
        assert!(run.stdout().contains(cmd), "missing {cmd}:\n{}", run.stdout());
    }
}

#[test]
fn config_channels_lists_every_module() {
    fleet()
        .args(&["config", "channels"])
        .passes()
        .stdout_has("config:general")
        .stdout_has("config:welcome")
        .stdout_has("config:logging");
}
