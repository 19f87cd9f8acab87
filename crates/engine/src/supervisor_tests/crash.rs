// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::{TenantStatus, SYSTEM_ACTOR};

#[tokio::test]
async fn unexpected_exit_without_budget_leaves_tenant_crashed() {
    let ctx = setup_with(no_restart_config());
    let t1 = ctx.register("t1");
    let pid = ctx.start_running(&t1).await;

    ctx.adapter.crash(pid, 137);

    wait_for("crash recorded", || ctx.phase(&t1) == WorkerPhase::Crashed).await;
    let tenant = ctx.tenant(&t1);
    assert!(!tenant.is_running);
    assert_eq!(tenant.process_id, None);
    assert_eq!(tenant.error_count, 1);
    assert_eq!(tenant.status, TenantStatus::Error);
    assert_eq!(
        tenant.last_error.as_deref(),
        Some("worker exited unexpectedly (exit code 137)")
    );
    assert_eq!(ctx.supervisor.status(&t1).pid, None);
    assert_eq!(ctx.adapter.spawn_count("t1"), 1);
}

#[tokio::test]
async fn crashed_worker_is_restarted_after_backoff() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let first = ctx.start_running(&t1).await;

    ctx.adapter.crash(first, 1);

    wait_for("automatic restart", || {
        let status = ctx.supervisor.status(&t1);
        status.phase == WorkerPhase::Running && status.pid != Some(first)
    })
    .await;
    let status = ctx.supervisor.status(&t1);
    assert_eq!(status.restart_count, 1);
    let tenant = ctx.tenant(&t1);
    assert!(tenant.is_running);
    assert_eq!(tenant.process_id, status.pid);
    assert_eq!(tenant.error_count, 0);

    let last = ctx.store.audit_for("t1").pop().unwrap();
    assert_eq!(last.action, AuditAction::TenantStarted);
    assert_eq!(last.user_id, SYSTEM_ACTOR);
}

#[tokio::test]
async fn error_message_while_running_kills_worker() {
    let ctx = setup_with(no_restart_config());
    let t1 = ctx.register("t1");
    let pid = ctx.start_running(&t1).await;

    ctx.adapter.report_error(pid, "gateway closed");

    wait_for("crash recorded", || ctx.phase(&t1) == WorkerPhase::Crashed).await;
    wait_for("worker killed", || ctx.adapter.live_pids("t1").is_empty()).await;
    assert!(ctx.adapter.calls().contains(&WorkerCall::Kill { pid }));
    assert_eq!(
        ctx.tenant(&t1).last_error.as_deref(),
        Some("worker reported error: gateway closed")
    );
    assert_eq!(ctx.tenant(&t1).error_count, 1);
}

#[tokio::test]
async fn restarts_stop_once_budget_is_spent() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let pid = ctx.start_running(&t1).await;
    ctx.adapter
        .set_default_script(FakeWorkerScript::spawn_fails("binary missing"));

    ctx.adapter.crash(pid, 1);

    // One original spawn plus three automatic attempts
    wait_for("restart attempts", || ctx.adapter.spawn_count("t1") == 4).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(ctx.adapter.spawn_count("t1"), 4);
    assert_eq!(ctx.phase(&t1), WorkerPhase::Crashed);
    assert_eq!(ctx.supervisor.status(&t1).restart_count, 3);
    assert_eq!(ctx.tenant(&t1).error_count, 4);
}

#[tokio::test]
async fn operator_start_supersedes_pending_restart() {
    let ctx = setup_with(SupervisorConfig {
        backoff: BackoffPolicy {
            base: Duration::from_millis(200),
            max: Duration::from_millis(200),
            max_restarts: 3,
        },
        ..fast_config()
    });
    let t1 = ctx.register("t1");
    let first = ctx.start_running(&t1).await;
    ctx.adapter.crash(first, 1);
    wait_for("crash recorded", || ctx.phase(&t1) == WorkerPhase::Crashed).await;

    let second = ctx.start_running(&t1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(ctx.adapter.spawn_count("t1"), 2);
    assert_eq!(ctx.supervisor.status(&t1).pid, Some(second));
    assert_eq!(ctx.supervisor.status(&t1).restart_count, 0);
}

#[tokio::test]
async fn graceful_stop_is_not_a_crash() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.start_running(&t1).await;

    ctx.supervisor.stop(&t1, "operator").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(ctx.phase(&t1), WorkerPhase::Stopped);
    assert_eq!(ctx.tenant(&t1).error_count, 0);
    assert_eq!(ctx.adapter.spawn_count("t1"), 1);
}

#[tokio::test]
async fn no_restart_after_shutdown() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    let pid = ctx.start_running(&t1).await;
    ctx.supervisor.shutdown_all().await;

    ctx.adapter.crash(pid, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(ctx.adapter.spawn_count("t1"), 1);
    assert_eq!(ctx.phase(&t1), WorkerPhase::Stopped);
}
