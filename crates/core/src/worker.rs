// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime worker phase and health snapshot types.

use crate::id::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment handed to every worker process
pub mod env {
    pub const TENANT_ID: &str = "FLEET_TENANT_ID";
    /// Decrypted upstream token
    pub const TOKEN: &str = "DISCORD_TOKEN";
    pub const CLIENT_ID: &str = "DISCORD_CLIENT_ID";
    /// Already routed to the tenant's schema
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const REDIS_URL: &str = "REDIS_URL";
}

/// Phase of a supervised worker process.
///
/// ```text
/// STOPPED -> STARTING -> RUNNING -> STOPPING -> STOPPED
///               |           |
///               +-----------+--> CRASHED
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerPhase {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Crashed,
}

impl WorkerPhase {
    /// A live child process is (or is about to be) registered in this phase.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            WorkerPhase::Starting | WorkerPhase::Running | WorkerPhase::Stopping
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Stopped => "STOPPED",
            WorkerPhase::Starting => "STARTING",
            WorkerPhase::Running => "RUNNING",
            WorkerPhase::Stopping => "STOPPING",
            WorkerPhase::Crashed => "CRASHED",
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest health report from a worker. Cached, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub tenant_id: TenantId,
    pub guild_count: u64,
    pub uptime_ms: u64,
    pub memory_bytes: u64,
    pub observed_at: DateTime<Utc>,
}
