// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant state-change events.
//!
//! The supervisor and control API never edit tenant records in place; they
//! emit events which the store applies to its materialized state.

use crate::audit::AuditLogEntry;
use crate::id::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serializes with `{"type": "tenant:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// New tenant, or a replaced credential for an existing one
    #[serde(rename = "tenant:registered")]
    TenantRegistered {
        id: TenantId,
        encrypted_credential: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        at: DateTime<Utc>,
    },

    /// Worker reported `ready`
    #[serde(rename = "tenant:started")]
    TenantStarted {
        id: TenantId,
        pid: u32,
        at: DateTime<Utc>,
    },

    /// Worker exited after a shutdown handshake, or was found orphaned
    #[serde(rename = "tenant:stopped")]
    TenantStopped { id: TenantId, at: DateTime<Utc> },

    /// Start or communication attempt failed
    #[serde(rename = "tenant:failed")]
    TenantFailed {
        id: TenantId,
        error: String,
        at: DateTime<Utc>,
    },

    /// Operator cleared the error counter
    #[serde(rename = "tenant:errors_cleared")]
    TenantErrorsCleared { id: TenantId },

    #[serde(rename = "audit:recorded")]
    AuditRecorded { entry: AuditLogEntry },
}

impl Event {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            Event::TenantRegistered { id, .. }
            | Event::TenantStarted { id, .. }
            | Event::TenantStopped { id, .. }
            | Event::TenantFailed { id, .. }
            | Event::TenantErrorsCleared { id } => id,
            Event::AuditRecorded { entry } => &entry.tenant_id,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::TenantRegistered { .. } => "tenant:registered",
            Event::TenantStarted { .. } => "tenant:started",
            Event::TenantStopped { .. } => "tenant:stopped",
            Event::TenantFailed { .. } => "tenant:failed",
            Event::TenantErrorsCleared { .. } => "tenant:errors_cleared",
            Event::AuditRecorded { .. } => "audit:recorded",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
