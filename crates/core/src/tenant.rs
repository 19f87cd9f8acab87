// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant record: one customer's bot instance as persisted by the manager.

use crate::id::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted lifecycle status of a tenant.
///
/// Distinct from [`Tenant::is_running`], which is the authoritative
/// liveness flag; `status` records how the last start attempt went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    #[default]
    Pending,
    Active,
    Suspended,
    Error,
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TenantStatus::Pending => "PENDING",
            TenantStatus::Active => "ACTIVE",
            TenantStatus::Suspended => "SUSPENDED",
            TenantStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A tenant as held in the manager's store.
///
/// Invariant: `is_running` implies `process_id.is_some()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    #[serde(default)]
    pub status: TenantStatus,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub process_id: Option<u32>,
    /// `iv:authTag:ciphertext` envelope produced by the vault
    pub encrypted_credential: String,
    /// Upstream application id, falls back to the manager-wide default
    #[serde(default)]
    pub client_id: Option<String>,
    /// Failed start/communication attempts; reset only by a successful start
    /// or an explicit operator clear
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_stopped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(id: TenantId, encrypted_credential: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TenantStatus::Pending,
            is_running: false,
            process_id: None,
            encrypted_credential,
            client_id: None,
            error_count: 0,
            last_error: None,
            last_started_at: None,
            last_stopped_at: None,
            created_at,
        }
    }

    /// Whether the tenant has crossed the operator-configured error ceiling.
    pub fn is_blocked(&self, ceiling: u32) -> bool {
        self.error_count >= ceiling
    }
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
