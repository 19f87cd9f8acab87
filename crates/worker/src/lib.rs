// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Worker side of the manager/worker contract.
//!
//! A worker is one tenant's bot process. It reads [`ManagerMessage`]s on
//! stdin, writes [`WorkerMessage`]s on stdout and logs to stderr.
//!
//! [`ManagerMessage`]: fleet_adapters::ManagerMessage
//! [`WorkerMessage`]: fleet_adapters::WorkerMessage

pub mod env;
mod memory;
mod runtime;
mod session;
mod settings;

pub use env::{EnvError, WorkerEnv};
pub use memory::resident_bytes;
pub use runtime::{ExitReason, WorkerError, WorkerRuntime};
pub use session::{BotSession, FatalReporter, IdleSession, SessionError};
pub use settings::{LoadError, NoSettings, SettingsCache, SettingsLoader};
