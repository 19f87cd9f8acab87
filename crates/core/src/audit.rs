// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit trail of Control API mutations.

use crate::id::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User id recorded for actions the manager takes on its own (auto restart,
/// startup reconciliation).
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TenantRegistered,
    TenantStarted,
    TenantStopped,
    TenantErrorsCleared,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::TenantRegistered => "TENANT_REGISTERED",
            AuditAction::TenantStarted => "TENANT_STARTED",
            AuditAction::TenantStopped => "TENANT_STOPPED",
            AuditAction::TenantErrorsCleared => "TENANT_ERRORS_CLEARED",
        };
        f.write_str(s)
    }
}

/// One audit record. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub tenant_id: TenantId,
    pub user_id: String,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
}
