// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: worker child processes and the config bus

pub mod ipc;
pub mod pubsub;
pub mod traced;
pub mod worker;

pub use ipc::{Inbound, ManagerMessage, ProtocolError, WorkerMessage};
pub use pubsub::{
    BusError, BusMessage, BusSubscription, ConfigBus, ConfigPublisher, LocalBus, RedisBus,
};
pub use traced::TracedWorkerAdapter;
pub use worker::{
    ProcessAdapter, ProcessControl, SpawnError, WorkerAdapter, WorkerEvent, WorkerExit,
    WorkerProcess, WorkerSender, WorkerSpawnConfig,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use pubsub::FakeConfigBus;
#[cfg(any(test, feature = "test-support"))]
pub use worker::{FakeStartup, FakeWorkerAdapter, FakeWorkerScript, WorkerCall};
