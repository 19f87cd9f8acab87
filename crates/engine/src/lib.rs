// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Fleet engine: worker supervision, health polling, config dispatch

mod backoff;
mod error;
mod health;
mod subscriber;
mod supervisor;

pub use backoff::BackoffPolicy;
pub use error::SupervisorError;
pub use health::{HealthMonitor, HealthSweep};
pub use subscriber::{ConfigHandler, ConfigSubscriber, DispatchReport, HandlerError};
pub use supervisor::{
    FleetSummary, StartOutcome, StopOutcome, Supervisor, SupervisorConfig, SupervisorDeps,
    WorkerStatus,
};
