// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the supervisor

use fleet_core::TenantId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("tenant not found: {0}")]
    TenantNotFound(TenantId),
    #[error("tenant {0} is not running")]
    NotRunning(TenantId),
    #[error("tenant {tenant_id} has {count} errors (ceiling {ceiling}); clear errors before starting")]
    ErrorCeiling {
        tenant_id: TenantId,
        count: u32,
        ceiling: u32,
    },
    #[error("credential for tenant {0} failed integrity check")]
    Integrity(TenantId),
    #[error("invalid tenant id {0:?}: needs at least one of [A-Za-z0-9_]")]
    InvalidTenantId(String),
    #[error("tenant id {tenant_id} maps to the same schema as existing tenant {owner}")]
    SchemaCollision { tenant_id: TenantId, owner: TenantId },
    /// Spawn failure, IPC timeout, or a worker-reported error
    #[error("{0}")]
    Upstream(String),
}
