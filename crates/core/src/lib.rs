// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-core: domain types for the multi-tenant bot control plane

pub mod audit;
pub mod clock;
pub mod config_update;
pub mod event;
pub mod id;
pub mod namespace;
pub mod signing;
pub mod tenant;
pub mod vault;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use audit::{AuditAction, AuditLogEntry, SYSTEM_ACTOR};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config_update::{ConfigAction, ConfigModule, ConfigUpdateMessage, ParseConfigError};
pub use event::Event;
pub use id::{GuildId, IdGen, TenantId, UuidIdGen};
pub use namespace::SchemaName;
pub use tenant::{Tenant, TenantStatus};
pub use vault::{VaultError, VaultKey};
pub use worker::{HealthSnapshot, WorkerPhase};
