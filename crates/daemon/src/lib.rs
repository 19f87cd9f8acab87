// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleetd: the control-plane manager.
//!
//! Owns the tenant store and the worker supervisor and serves the Control
//! API over HTTP.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod api;
pub mod config;
pub mod env;
pub mod lifecycle;
pub mod logging;

pub use api::{ApiAuth, ApiError, ApiState, Envelope, Operator, RateLimiter};
pub use config::{Config, ConfigError, FileConfig, Secrets};
pub use lifecycle::{startup, startup_with, Daemon, DaemonAdapter, LifecycleError, StartupResult};
