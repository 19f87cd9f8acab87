// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{BackoffPolicy, SupervisorConfig, SupervisorDeps};
use fleet_adapters::{FakeWorkerAdapter, FakeWorkerScript, WorkerCall};
use fleet_core::test_support::test_vault_key;
use fleet_core::{FakeClock, WorkerPhase};
use fleet_storage::TenantStore;

fn monitored() -> (Supervisor<FakeWorkerAdapter, FakeClock>, FakeWorkerAdapter) {
    let adapter = FakeWorkerAdapter::new();
    let supervisor = Supervisor::new(
        SupervisorDeps {
            adapter: adapter.clone(),
            store: TenantStore::in_memory(),
            router: None,
            vault_key: test_vault_key(),
            clock: FakeClock::new(),
        },
        SupervisorConfig {
            ready_timeout: Duration::from_millis(100),
            shutdown_grace: Duration::from_millis(100),
            health_timeout: Duration::from_millis(50),
            backoff: BackoffPolicy {
                max_restarts: 0,
                ..BackoffPolicy::default()
            },
            ..SupervisorConfig::default()
        },
    );
    (supervisor, adapter)
}

async fn running(supervisor: &Supervisor<FakeWorkerAdapter, FakeClock>, id: &str) -> TenantId {
    let tenant_id = TenantId::new(id);
    supervisor
        .register(&tenant_id, "token", None, "operator")
        .unwrap();
    supervisor.start(&tenant_id, "operator").await.unwrap();
    tenant_id
}

#[tokio::test]
async fn sweep_splits_healthy_and_unresponsive() {
    let (supervisor, adapter) = monitored();
    adapter.push_script(
        "quiet",
        FakeWorkerScript {
            answers_health: false,
            ..FakeWorkerScript::default()
        },
    );
    let chatty = running(&supervisor, "chatty").await;
    let quiet = running(&supervisor, "quiet").await;
    let monitor = HealthMonitor::new(supervisor.clone(), Duration::from_secs(60));

    let sweep = monitor.sweep().await;

    assert_eq!(sweep.healthy, vec![chatty.clone()]);
    assert_eq!(sweep.failed, vec![quiet.clone()]);
    assert_eq!(supervisor.status(&chatty).phase, WorkerPhase::Running);
    assert_eq!(supervisor.status(&quiet).phase, WorkerPhase::Crashed);
}

#[tokio::test]
async fn sweep_with_nothing_running_is_empty() {
    let (supervisor, _adapter) = monitored();
    let monitor = HealthMonitor::new(supervisor, Duration::from_secs(60));
    assert_eq!(monitor.sweep().await, HealthSweep::default());
}

#[tokio::test]
async fn spawned_monitor_probes_until_shutdown() {
    let (supervisor, adapter) = monitored();
    let t1 = running(&supervisor, "t1").await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = HealthMonitor::new(supervisor.clone(), Duration::from_millis(20)).spawn(shutdown_rx);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while supervisor.status(&t1).last_health.is_none() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(supervisor.status(&t1).last_health.is_some());
    assert!(adapter
        .calls()
        .iter()
        .any(|c| matches!(c, WorkerCall::Send { .. })));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
