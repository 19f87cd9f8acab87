// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use fleet_core::test_support::{
    tenant_failed_event, tenant_registered_event, tenant_started_event, tenant_stopped_event,
};
use fleet_core::{AuditAction, TenantId};

fn state_with(events: &[Event]) -> MaterializedState {
    let mut state = MaterializedState::default();
    for event in events {
        state.apply_event(event);
    }
    state
}

#[test]
fn registration_creates_pending_tenant() {
    let state = state_with(&[tenant_registered_event("t1")]);
    let tenant = state.tenant("t1").unwrap();
    assert_eq!(tenant.status, TenantStatus::Pending);
    assert!(!tenant.is_running);
}

#[test]
fn reregistration_replaces_credential_but_keeps_counters() {
    let mut state = state_with(&[
        tenant_registered_event("t1"),
        tenant_failed_event("t1", "boom"),
    ]);
    state.apply_event(&Event::TenantRegistered {
        id: TenantId::new("t1"),
        encrypted_credential: "new:cred:xx".to_string(),
        client_id: Some("app".to_string()),
        at: Utc::now(),
    });
    let tenant = state.tenant("t1").unwrap();
    assert_eq!(tenant.encrypted_credential, "new:cred:xx");
    assert_eq!(tenant.client_id.as_deref(), Some("app"));
    assert_eq!(tenant.error_count, 1);
}

#[test]
fn started_sets_running_pid_and_resets_errors() {
    let state = state_with(&[
        tenant_registered_event("t1"),
        tenant_failed_event("t1", "timeout"),
        tenant_started_event("t1", 77),
    ]);
    let tenant = state.tenant("t1").unwrap();
    assert_eq!(tenant.status, TenantStatus::Active);
    assert!(tenant.is_running);
    assert_eq!(tenant.process_id, Some(77));
    assert_eq!(tenant.error_count, 0);
    assert_eq!(tenant.last_error, None);
    assert!(tenant.last_started_at.is_some());
}

#[test]
fn stopped_clears_pid() {
    let state = state_with(&[
        tenant_registered_event("t1"),
        tenant_started_event("t1", 77),
        tenant_stopped_event("t1"),
    ]);
    let tenant = state.tenant("t1").unwrap();
    assert!(!tenant.is_running);
    assert_eq!(tenant.process_id, None);
    assert!(tenant.last_stopped_at.is_some());
    assert_eq!(tenant.status, TenantStatus::Active);
}

#[test]
fn failures_accumulate() {
    let state = state_with(&[
        tenant_registered_event("t1"),
        tenant_failed_event("t1", "one"),
        tenant_failed_event("t1", "two"),
    ]);
    let tenant = state.tenant("t1").unwrap();
    assert_eq!(tenant.status, TenantStatus::Error);
    assert_eq!(tenant.error_count, 2);
    assert_eq!(tenant.last_error.as_deref(), Some("two"));
}

#[test]
fn failure_while_running_clears_liveness() {
    let state = state_with(&[
        tenant_registered_event("t1"),
        tenant_started_event("t1", 5),
        tenant_failed_event("t1", "crashed"),
    ]);
    let tenant = state.tenant("t1").unwrap();
    assert!(!tenant.is_running);
    assert_eq!(tenant.process_id, None);
    assert!(tenant.last_stopped_at.is_some());
}

#[test]
fn errors_cleared_returns_to_pending() {
    let mut state = state_with(&[
        tenant_registered_event("t1"),
        tenant_failed_event("t1", "x"),
    ]);
    state.apply_event(&Event::TenantErrorsCleared {
        id: TenantId::new("t1"),
    });
    let tenant = state.tenant("t1").unwrap();
    assert_eq!(tenant.error_count, 0);
    assert_eq!(tenant.status, TenantStatus::Pending);
}

#[test]
fn events_for_unknown_tenant_are_ignored() {
    let state = state_with(&[tenant_started_event("ghost", 1)]);
    assert!(state.tenants.is_empty());
}

#[test]
fn audit_entries_filter_by_tenant_in_order() {
    let entry = |id: &str, tenant: &str, action| AuditLogEntry {
        id: id.to_string(),
        tenant_id: TenantId::new(tenant),
        user_id: "op".to_string(),
        action,
        timestamp: Utc::now(),
    };
    let state = state_with(&[
        Event::AuditRecorded {
            entry: entry("1", "t1", AuditAction::TenantStopped),
        },
        Event::AuditRecorded {
            entry: entry("2", "t2", AuditAction::TenantStarted),
        },
        Event::AuditRecorded {
            entry: entry("3", "t1", AuditAction::TenantStarted),
        },
    ]);
    let actions: Vec<_> = state.audit_for("t1").into_iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::TenantStopped, AuditAction::TenantStarted]
    );
}
