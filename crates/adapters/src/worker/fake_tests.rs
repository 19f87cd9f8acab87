// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::TenantId;
use std::time::Duration;

fn config(tenant: &str) -> WorkerSpawnConfig {
    WorkerSpawnConfig {
        tenant_id: TenantId::new(tenant),
        program: "fleet-worker".into(),
        args: vec![],
        env: vec![("FLEET_TENANT_ID".to_string(), tenant.to_string())],
    }
}

async fn next(process: &mut WorkerProcess) -> WorkerEvent {
    tokio::time::timeout(Duration::from_secs(1), process.events.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn default_script_reports_ready_and_answers_health() {
    let adapter = FakeWorkerAdapter::new();
    let mut process = adapter.spawn(config("t1")).await.unwrap();

    assert_eq!(
        next(&mut process).await,
        WorkerEvent::Message(WorkerMessage::Ready { guilds: 3 })
    );
    process
        .sender
        .send(ManagerMessage::HealthRequest)
        .await
        .unwrap();
    assert!(matches!(
        next(&mut process).await,
        WorkerEvent::Message(WorkerMessage::Health { guilds: 3, .. })
    ));
    assert_eq!(adapter.live_pids("t1"), vec![process.pid]);
}

#[tokio::test]
async fn shutdown_exits_cleanly() {
    let adapter = FakeWorkerAdapter::new();
    let mut process = adapter.spawn(config("t1")).await.unwrap();
    let _ready = next(&mut process).await;

    process.sender.send(ManagerMessage::Shutdown).await.unwrap();

    assert_eq!(process.control.wait_exit().await, WorkerExit { code: Some(0) });
    assert!(adapter.live_pids("t1").is_empty());
}

#[tokio::test]
async fn deaf_worker_only_dies_when_killed() {
    let adapter = FakeWorkerAdapter::new();
    adapter.push_script("t1", FakeWorkerScript::ready(1).deaf());
    let mut process = adapter.spawn(config("t1")).await.unwrap();
    let _ready = next(&mut process).await;

    process.sender.send(ManagerMessage::Shutdown).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!process.control.has_exited());

    process.control.kill();
    assert_eq!(process.control.wait_exit().await, WorkerExit { code: None });
    assert!(adapter.calls().contains(&WorkerCall::Kill { pid: process.pid }));
}

#[tokio::test]
async fn queued_scripts_apply_in_order() {
    let adapter = FakeWorkerAdapter::new();
    adapter.push_script("t1", FakeWorkerScript::spawn_fails("no binary"));
    adapter.push_script("t1", FakeWorkerScript::failing("bad token"));

    assert!(matches!(
        adapter.spawn(config("t1")).await,
        Err(SpawnError::Failed(_))
    ));
    let mut second = adapter.spawn(config("t1")).await.unwrap();
    assert!(matches!(
        next(&mut second).await,
        WorkerEvent::Message(WorkerMessage::Error { .. })
    ));
    let mut third = adapter.spawn(config("t1")).await.unwrap();
    assert!(matches!(
        next(&mut third).await,
        WorkerEvent::Message(WorkerMessage::Ready { .. })
    ));
    assert_eq!(adapter.spawn_count("t1"), 3);
}

#[tokio::test]
async fn crash_emits_exit_event() {
    let adapter = FakeWorkerAdapter::new();
    adapter.push_script("t1", FakeWorkerScript::silent());
    let mut process = adapter.spawn(config("t1")).await.unwrap();

    adapter.crash(process.pid, 137);

    assert_eq!(
        next(&mut process).await,
        WorkerEvent::Exited(WorkerExit { code: Some(137) })
    );
}
