// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized tenant state built by applying events

use fleet_core::{AuditLogEntry, Event, Tenant, TenantStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tenants keyed by id plus the append-only audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    #[serde(default)]
    pub tenants: HashMap<String, Tenant>,
    #[serde(default)]
    pub audit_log: Vec<AuditLogEntry>,
}

impl MaterializedState {
    pub fn tenant(&self, id: &str) -> Option<&Tenant> {
        self.tenants.get(id)
    }

    /// Apply an event. Events for unknown tenants are ignored (except
    /// registration, which creates the tenant).
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::TenantRegistered {
                id,
                encrypted_credential,
                client_id,
                at,
            } => {
                let tenant = self
                    .tenants
                    .entry(id.to_string())
                    .or_insert_with(|| Tenant::new(id.clone(), encrypted_credential.clone(), *at));
                tenant.encrypted_credential = encrypted_credential.clone();
                tenant.client_id = client_id.clone();
            }

            Event::TenantStarted { id, pid, at } => {
                if let Some(tenant) = self.tenants.get_mut(id.as_str()) {
                    tenant.status = TenantStatus::Active;
                    tenant.is_running = true;
                    tenant.process_id = Some(*pid);
                    tenant.last_started_at = Some(*at);
                    tenant.error_count = 0;
                    tenant.last_error = None;
                }
            }

            Event::TenantStopped { id, at } => {
                if let Some(tenant) = self.tenants.get_mut(id.as_str()) {
                    tenant.is_running = false;
                    tenant.process_id = None;
                    tenant.last_stopped_at = Some(*at);
                }
            }

            Event::TenantFailed { id, error, at } => {
                if let Some(tenant) = self.tenants.get_mut(id.as_str()) {
                    if tenant.is_running {
                        tenant.last_stopped_at = Some(*at);
                    }
                    tenant.status = TenantStatus::Error;
                    tenant.is_running = false;
                    tenant.process_id = None;
                    tenant.error_count = tenant.error_count.saturating_add(1);
                    tenant.last_error = Some(error.clone());
                }
            }

            Event::TenantErrorsCleared { id } => {
                if let Some(tenant) = self.tenants.get_mut(id.as_str()) {
                    tenant.error_count = 0;
                    tenant.last_error = None;
                    if tenant.status == TenantStatus::Error {
                        tenant.status = TenantStatus::Pending;
                    }
                }
            }

            Event::AuditRecorded { entry } => {
                self.audit_log.push(entry.clone());
            }
        }
    }

    /// Audit entries for one tenant, oldest first
    pub fn audit_for(&self, tenant_id: &str) -> Vec<AuditLogEntry> {
        self.audit_log
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
