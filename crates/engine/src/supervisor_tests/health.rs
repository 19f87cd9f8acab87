// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn no_health_replies() -> FakeWorkerScript {
    FakeWorkerScript {
        answers_health: false,
        ..FakeWorkerScript::default()
    }
}

#[tokio::test]
async fn probe_returns_worker_snapshot() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.adapter.push_script("t1", FakeWorkerScript::ready(7));
    let pid = ctx.start_running(&t1).await;

    let snapshot = ctx.supervisor.health_probe(&t1).await.unwrap();

    assert_eq!(snapshot.tenant_id, t1);
    assert_eq!(snapshot.guild_count, 7);
    assert_eq!(snapshot.memory_bytes, 48 * 1024 * 1024);
    assert!(ctx.adapter.calls().contains(&WorkerCall::Send {
        pid,
        message: fleet_adapters::ManagerMessage::HealthRequest
    }));
    let status = ctx.supervisor.status(&t1);
    assert_eq!(status.last_health, Some(snapshot));
    assert_eq!(status.guilds, Some(7));
}

#[tokio::test]
async fn probe_requires_running_worker() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    assert_eq!(
        ctx.supervisor.health_probe(&t1).await.unwrap_err(),
        SupervisorError::NotRunning(t1)
    );
}

#[tokio::test]
async fn unanswered_probe_crashes_worker() {
    let ctx = setup_with(no_restart_config());
    let t1 = ctx.register("t1");
    ctx.adapter.push_script("t1", no_health_replies());
    let pid = ctx.start_running(&t1).await;

    let err = ctx.supervisor.health_probe(&t1).await.unwrap_err();

    assert!(matches!(err, SupervisorError::Upstream(ref m) if m.contains("timed out")));
    assert_eq!(ctx.phase(&t1), WorkerPhase::Crashed);
    assert_eq!(ctx.tenant(&t1).error_count, 1);
    wait_for("worker killed", || ctx.adapter.live_pids("t1").is_empty()).await;
    assert!(ctx.adapter.calls().contains(&WorkerCall::Kill { pid }));
}

#[tokio::test]
async fn concurrent_probes_each_get_a_reply() {
    let ctx = setup();
    let t1 = ctx.register("t1");
    ctx.start_running(&t1).await;

    let (a, b) = tokio::join!(
        ctx.supervisor.health_probe(&t1),
        ctx.supervisor.health_probe(&t1)
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
}
