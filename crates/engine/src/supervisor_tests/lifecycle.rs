// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::test_support::tenant_started_event;
use fleet_core::{Event, TenantStatus};

#[tokio::test]
async fn start_waits_for_ready_then_runs() {
    let ctx = setup();
    let t1 = ctx.register("t1");

    let pid = ctx.start_running(&t1).await;

    assert_eq!(ctx.phase(&t1), WorkerPhase::Running);
    let tenant = ctx.tenant(&t1);
    assert!(tenant.is_running);
    assert_eq!(tenant.process_id, Some(pid));
    assert_eq!(tenant.status, TenantStatus::Active);
    assert!(tenant.last_started_at.is_some());
    assert_eq!(
        ctx.audit_actions(&t1),
        vec![AuditAction::TenantRegistered, AuditAction::TenantStarted]
    );
    assert_eq!(ctx.supervisor.status(&t1).guilds, Some(3));
    assert_eq!(ctx.adapter.live_pids("t1"), vec![pid]);
}

#[tokio::test]
async fn start_hands_worker_its_environment() {
    let ctx = setup();
    let t1 = ctx.register("acme-1");
    ctx.start_running(&t1).await;

    let env = match &ctx.adapter.calls()[0] {
        WorkerCall::Spawn { env, .. } => env.clone(),
        other => panic!("unexpected call {other:?}"),
    };
    let get = |key: &str| {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(get("FLEET_TENANT_ID"), "acme-1");
    assert_eq!(get("DISCORD_TOKEN"), "token-acme-1");
    assert_eq!(get("DISCORD_CLIENT_ID"), "app-default");
    assert!(get("DATABASE_URL").ends_with("schema=tenant_acme1"));
    assert_eq!(get("REDIS_URL"), "redis://127.0.0.1:6379");
}

#[tokio::test]
async fn tenant_client_id_overrides_default() {
    let ctx = setup();
    let t1 = TenantId::new("t1");
    ctx.supervisor
        .register(&t1, "tok", Some("tenant-app".to_string()), "operator")
        .unwrap();
    ctx.start_running(&t1).await;

    let WorkerCall::Spawn { env, .. } = &ctx.adapter.calls()[0] else {
        panic!("expected spawn");
    };
    assert!(env.contains(&("DISCORD_CLIENT_ID".to_string(), "tenant-app".to_string())));
}

#[tokio::test]
async fn start_on_running_tenant_is_a_noop() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let pid = ctx.start_running(&t1).await;

    let again = ctx.supervisor.start(&t1, "operator").await.unwrap();

    assert_eq!(again, StartOutcome::AlreadyRunning { pid: Some(pid) });
    assert_eq!(ctx.adapter.spawn_count("t1"), 1);
    assert_eq!(ctx.tenant(&t1).error_count, 0);
    assert_eq!(ctx.adapter.live_pids("t1").len(), 1);
}

#[tokio::test]
async fn worker_that_never_reports_ready_crashes() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.adapter.push_script("t1", FakeWorkerScript::silent());

    let err = ctx.supervisor.start(&t1, "operator").await.unwrap_err();

    assert!(matches!(err, SupervisorError::Upstream(ref m) if m.contains("ready within")));
    assert_eq!(ctx.phase(&t1), WorkerPhase::Crashed);
    let tenant = ctx.tenant(&t1);
    assert_eq!(tenant.error_count, 1);
    assert_eq!(tenant.status, TenantStatus::Error);
    assert!(!tenant.is_running);
    assert!(tenant.last_error.is_some());
    wait_for("silent worker killed", || ctx.adapter.live_pids("t1").is_empty()).await;
}

#[tokio::test]
async fn error_message_during_start_crashes() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.adapter
        .push_script("t1", FakeWorkerScript::failing("invalid token"));

    let err = ctx.supervisor.start(&t1, "operator").await.unwrap_err();

    assert!(matches!(err, SupervisorError::Upstream(ref m) if m.contains("invalid token")));
    assert_eq!(ctx.phase(&t1), WorkerPhase::Crashed);
    assert_eq!(
        ctx.tenant(&t1).last_error.as_deref(),
        Some("worker reported error: invalid token")
    );
}

#[tokio::test]
async fn spawn_failure_counts_as_error() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.adapter
        .push_script("t1", FakeWorkerScript::spawn_fails("no such file"));

    let err = ctx.supervisor.start(&t1, "operator").await.unwrap_err();

    assert!(matches!(err, SupervisorError::Upstream(_)));
    assert_eq!(ctx.tenant(&t1).error_count, 1);
    assert_eq!(ctx.phase(&t1), WorkerPhase::Crashed);
}

#[tokio::test]
async fn error_ceiling_blocks_start_without_spawning() {
    let ctx = setup_with(SupervisorConfig {
        error_ceiling: 2,
        ..fast_config()
    });
    let t1 = ctx.register("t1");
    ctx.adapter.push_script("t1", FakeWorkerScript::failing("a"));
    ctx.adapter.push_script("t1", FakeWorkerScript::failing("b"));
    assert!(ctx.supervisor.start(&t1, "operator").await.is_err());
    assert!(ctx.supervisor.start(&t1, "operator").await.is_err());

    let err = ctx.supervisor.start(&t1, "operator").await.unwrap_err();

    assert_eq!(
        err,
        SupervisorError::ErrorCeiling {
            tenant_id: t1.clone(),
            count: 2,
            ceiling: 2
        }
    );
    assert_eq!(ctx.adapter.spawn_count("t1"), 2);
}

#[tokio::test]
async fn clearing_errors_unblocks_start() {
    let ctx = setup_with(SupervisorConfig {
        error_ceiling: 1,
        ..fast_config()
    });
    let t1 = ctx.register("t1");
    ctx.adapter.push_script("t1", FakeWorkerScript::failing("a"));
    assert!(ctx.supervisor.start(&t1, "operator").await.is_err());
    assert!(matches!(
        ctx.supervisor.start(&t1, "operator").await,
        Err(SupervisorError::ErrorCeiling { .. })
    ));

    let tenant = ctx.supervisor.reset_errors(&t1, "operator").unwrap();
    assert_eq!(tenant.error_count, 0);
    assert_eq!(tenant.status, TenantStatus::Pending);

    ctx.start_running(&t1).await;
    assert_eq!(
        ctx.audit_actions(&t1),
        vec![
            AuditAction::TenantRegistered,
            AuditAction::TenantErrorsCleared,
            AuditAction::TenantStarted
        ]
    );
}

#[tokio::test]
async fn tampered_credential_fails_start_without_spawning() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let registered = ctx.tenant(&t1);
    let mut envelope = registered.encrypted_credential;
    let last = envelope.pop().unwrap();
    envelope.push(if last == '0' { '1' } else { '0' });
    ctx.store.emit(Event::TenantRegistered {
        id: t1.clone(),
        encrypted_credential: envelope,
        client_id: None,
        at: registered.created_at,
    });

    let err = ctx.supervisor.start(&t1, "operator").await.unwrap_err();

    assert_eq!(err, SupervisorError::Integrity(t1.clone()));
    assert_eq!(ctx.adapter.spawn_count("t1"), 0);
    assert_eq!(ctx.tenant(&t1).error_count, 1);
    assert_eq!(ctx.phase(&t1), WorkerPhase::Crashed);
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
    let ctx = setup();
    let ghost = TenantId::new("ghost");
    assert_eq!(
        ctx.supervisor.start(&ghost, "operator").await.unwrap_err(),
        SupervisorError::TenantNotFound(ghost.clone())
    );
    assert_eq!(
        ctx.supervisor.stop(&ghost, "operator").await.unwrap_err(),
        SupervisorError::TenantNotFound(ghost)
    );
}

#[tokio::test]
async fn stop_shuts_worker_down_gracefully() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let pid = ctx.start_running(&t1).await;
    assert_eq!(ctx.router.cached(), 1);

    let outcome = ctx.supervisor.stop(&t1, "operator").await.unwrap();

    assert_eq!(outcome, StopOutcome { pid, forced: false });
    assert_eq!(ctx.phase(&t1), WorkerPhase::Stopped);
    let tenant = ctx.tenant(&t1);
    assert!(!tenant.is_running);
    assert_eq!(tenant.process_id, None);
    assert!(tenant.last_stopped_at.is_some());
    assert_eq!(tenant.error_count, 0);
    assert_eq!(
        ctx.audit_actions(&t1),
        vec![
            AuditAction::TenantRegistered,
            AuditAction::TenantStarted,
            AuditAction::TenantStopped
        ]
    );
    assert!(ctx.adapter.live_pids("t1").is_empty());
    assert_eq!(ctx.router.cached(), 0);
}

#[tokio::test]
async fn stop_on_stopped_tenant_errors_and_changes_nothing() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let before = ctx.tenant(&t1);
    let audit_before = ctx.audit_actions(&t1);

    let err = ctx.supervisor.stop(&t1, "operator").await.unwrap_err();

    assert_eq!(err, SupervisorError::NotRunning(t1.clone()));
    assert_eq!(ctx.tenant(&t1), before);
    assert_eq!(ctx.audit_actions(&t1), audit_before);
    assert_eq!(ctx.phase(&t1), WorkerPhase::Stopped);
}

#[tokio::test]
async fn unresponsive_worker_is_killed_after_grace() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.adapter
        .push_script("t1", FakeWorkerScript::ready(1).deaf());
    let pid = ctx.start_running(&t1).await;

    let outcome = ctx.supervisor.stop(&t1, "operator").await.unwrap();

    assert_eq!(outcome, StopOutcome { pid, forced: true });
    assert!(ctx.adapter.calls().contains(&WorkerCall::Kill { pid }));
    assert_eq!(ctx.phase(&t1), WorkerPhase::Stopped);
    assert_eq!(ctx.tenant(&t1).error_count, 0);
}

#[tokio::test]
async fn dropped_start_request_still_settles() {
    let ctx = setup_with(no_restart_config());
    let t1 = ctx.register("t1");
    ctx.adapter.push_script("t1", FakeWorkerScript::silent());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        ctx.supervisor.start(&t1, "operator"),
    )
    .await;
    assert!(abandoned.is_err());

    wait_for("abandoned start to crash", || {
        ctx.phase(&t1) == WorkerPhase::Crashed
    })
    .await;
    assert!(ctx.adapter.live_pids("t1").is_empty());
    assert_eq!(ctx.tenant(&t1).error_count, 1);
    ctx.start_running(&t1).await;
}

#[tokio::test]
async fn dropped_stop_request_still_stops() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.adapter
        .push_script("t1", FakeWorkerScript::ready(1).deaf());
    let pid = ctx.start_running(&t1).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        ctx.supervisor.stop(&t1, "operator"),
    )
    .await;
    assert!(abandoned.is_err());

    wait_for("abandoned stop to finish", || {
        ctx.phase(&t1) == WorkerPhase::Stopped
    })
    .await;
    assert!(ctx.adapter.calls().contains(&WorkerCall::Kill { pid }));
    assert!(ctx.adapter.live_pids("t1").is_empty());
    assert!(ctx.audit_actions(&t1).contains(&AuditAction::TenantStopped));
    ctx.start_running(&t1).await;
}

#[tokio::test]
async fn restart_stops_then_starts() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let first = ctx.start_running(&t1).await;

    let outcome = ctx.supervisor.restart(&t1, "operator").await.unwrap();

    let StartOutcome::Started { pid: second } = outcome else {
        panic!("expected a fresh start, got {outcome:?}");
    };
    assert_ne!(first, second);
    assert_eq!(ctx.phase(&t1), WorkerPhase::Running);
    assert_eq!(ctx.adapter.live_pids("t1"), vec![second]);
    assert_eq!(
        ctx.audit_actions(&t1),
        vec![
            AuditAction::TenantRegistered,
            AuditAction::TenantStarted,
            AuditAction::TenantStopped,
            AuditAction::TenantStarted
        ]
    );
}

#[tokio::test]
async fn restart_on_stopped_tenant_just_starts() {
    let ctx = setup();
    let t1 = ctx.register("t1");

    let outcome = ctx.supervisor.restart(&t1, "operator").await.unwrap();

    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert_eq!(
        ctx.audit_actions(&t1),
        vec![AuditAction::TenantRegistered, AuditAction::TenantStarted]
    );
}

#[tokio::test]
async fn concurrent_starts_for_one_tenant_spawn_once() {
    let ctx = setup();
    let t1 = ctx.register("t1");

    let (a, b) = tokio::join!(
        ctx.supervisor.start(&t1, "operator"),
        ctx.supervisor.start(&t1, "operator")
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let fresh = outcomes
        .iter()
        .filter(|o| matches!(o, StartOutcome::Started { .. }))
        .count();
    assert_eq!(fresh, 1);
    assert_eq!(ctx.adapter.spawn_count("t1"), 1);
    assert_eq!(ctx.adapter.live_pids("t1").len(), 1);
}

#[tokio::test]
async fn slow_tenant_does_not_block_another() {
    let ctx = setup_with(SupervisorConfig {
        ready_timeout: Duration::from_secs(2),
        ..fast_config()
    });
    let slow = ctx.register("slow");
    let fast = ctx.register("fast");
    ctx.adapter.push_script("slow", FakeWorkerScript::silent());

    let slow_supervisor = ctx.supervisor.clone();
    let slow_id = slow.clone();
    let pending = tokio::spawn(async move { slow_supervisor.start(&slow_id, "operator").await });
    wait_for("slow tenant starting", || {
        ctx.supervisor.status(&slow).phase == WorkerPhase::Starting
    })
    .await;

    let started = tokio::time::timeout(
        Duration::from_millis(500),
        ctx.supervisor.start(&fast, "operator"),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(matches!(started, StartOutcome::Started { .. }));
    assert_eq!(ctx.phase(&slow), WorkerPhase::Starting);
    pending.abort();
}

#[tokio::test]
async fn register_rejects_ids_without_schema_characters() {
    let ctx = setup();
    let err = ctx
        .supervisor
        .register(&TenantId::new("--"), "tok", None, "operator")
        .unwrap_err();
    assert_eq!(err, SupervisorError::InvalidTenantId("--".to_string()));
    assert!(ctx.store.list().is_empty());
}

#[tokio::test]
async fn register_refuses_id_sharing_a_schema() {
    let ctx = setup();
    let owner = ctx.register("ab");

    let err = ctx
        .supervisor
        .register(&TenantId::new("a.b"), "tok", None, "operator")
        .unwrap_err();

    assert_eq!(
        err,
        SupervisorError::SchemaCollision {
            tenant_id: TenantId::new("a.b"),
            owner: owner.clone(),
        }
    );
    assert_eq!(ctx.store.list().len(), 1);
    assert!(ctx.store.audit_for("a.b").is_empty());
}

#[tokio::test]
async fn stopped_tenant_keeps_its_schema() {
    let ctx = setup();
    let owner = ctx.register("a-b");
    ctx.start_running(&owner).await;
    ctx.supervisor.stop(&owner, "operator").await.unwrap();

    assert!(ctx
        .supervisor
        .register(&TenantId::new("ab"), "tok", None, "operator")
        .is_err());
    ctx.register("a-b");
    ctx.start_running(&owner).await;
}

#[tokio::test]
async fn register_encrypts_the_token() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let tenant = ctx.tenant(&t1);
    assert!(!tenant.encrypted_credential.contains("token-t1"));
    assert_eq!(
        fleet_core::vault::decrypt_string(&tenant.encrypted_credential, &test_vault_key())
            .unwrap(),
        "token-t1"
    );
}

#[tokio::test]
async fn orphaned_tenants_are_marked_stopped() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let t2 = ctx.register("t2");
    ctx.store.emit(tenant_started_event("t1", 4242));

    let reconciled = ctx.supervisor.reconcile_orphans();

    assert_eq!(reconciled, vec![t1.clone()]);
    assert!(!ctx.tenant(&t1).is_running);
    assert_eq!(ctx.tenant(&t1).process_id, None);
    assert!(!ctx.tenant(&t2).is_running);
}

#[tokio::test]
async fn shutdown_all_stops_every_worker() {
    let ctx = setup();
    let a = ctx.register("a");
    let b = ctx.register("b");
    ctx.start_running(&a).await;
    ctx.start_running(&b).await;

    let stopped = ctx.supervisor.shutdown_all().await;

    assert_eq!(stopped, 2);
    assert_eq!(ctx.phase(&a), WorkerPhase::Stopped);
    assert_eq!(ctx.phase(&b), WorkerPhase::Stopped);
    assert!(ctx.adapter.live_pids("a").is_empty());
    assert!(ctx.adapter.live_pids("b").is_empty());
}

#[tokio::test]
async fn summary_counts_phases_and_guilds() {
    let ctx = setup();
    let a = ctx.register("a");
    let _b = ctx.register("b");
    let c = ctx.register("c");
    ctx.adapter.push_script("a", FakeWorkerScript::ready(4));
    ctx.adapter.push_script("c", FakeWorkerScript::silent());
    ctx.start_running(&a).await;
    let _ = ctx.supervisor.start(&c, "operator").await;

    let summary = ctx.supervisor.summary();

    assert_eq!(summary.phases.get(&WorkerPhase::Running), Some(&1));
    assert_eq!(summary.phases.get(&WorkerPhase::Stopped), Some(&1));
    assert_eq!(summary.phases.get(&WorkerPhase::Crashed), Some(&1));
    assert_eq!(summary.total_guilds, 4);
}
