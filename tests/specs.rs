//! Behavioral specifications for the fleet binaries.
//!
//! These tests are black-box: they invoke `fleet`, `fleetd` and
//! `fleet-worker` and verify stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// daemon/
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;
#[path = "specs/daemon/startup.rs"]
mod daemon_startup;

// worker/
#[path = "specs/worker/ipc.rs"]
mod worker_ipc;
