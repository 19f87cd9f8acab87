// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor tests against the fake worker adapter

mod crash;
mod health;
mod lifecycle;

use super::*;
use fleet_adapters::{FakeWorkerAdapter, FakeWorkerScript, WorkerCall};
use fleet_core::test_support::test_vault_key;
use fleet_core::FakeClock;

type TestSupervisor = Supervisor<FakeWorkerAdapter, FakeClock>;

struct TestContext {
    supervisor: TestSupervisor,
    adapter: FakeWorkerAdapter,
    store: TenantStore,
    router: StoreRouter,
}

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        worker_program: PathBuf::from("fleet-worker"),
        worker_args: Vec::new(),
        error_ceiling: 5,
        ready_timeout: Duration::from_millis(100),
        shutdown_grace: Duration::from_millis(100),
        health_timeout: Duration::from_millis(100),
        backoff: BackoffPolicy {
            base: Duration::from_millis(10),
            max: Duration::from_millis(50),
            max_restarts: 3,
        },
        default_client_id: Some("app-default".to_string()),
        redis_url: Some("redis://127.0.0.1:6379".to_string()),
    }
}

/// Same as [`fast_config`] but crashed workers stay crashed
fn no_restart_config() -> SupervisorConfig {
    SupervisorConfig {
        backoff: BackoffPolicy {
            max_restarts: 0,
            ..fast_config().backoff
        },
        ..fast_config()
    }
}

fn setup_with(config: SupervisorConfig) -> TestContext {
    let adapter = FakeWorkerAdapter::new();
    let store = TenantStore::in_memory();
    let router = StoreRouter::new("postgresql://bot@db:5432/fleet").unwrap();
    let supervisor = Supervisor::new(
        SupervisorDeps {
            adapter: adapter.clone(),
            store: store.clone(),
            router: Some(router.clone()),
            vault_key: test_vault_key(),
            clock: FakeClock::new(),
        },
        config,
    );
    TestContext {
        supervisor,
        adapter,
        store,
        router,
    }
}

fn setup() -> TestContext {
    setup_with(fast_config())
}

impl TestContext {
    fn register(&self, id: &str) -> TenantId {
        let tenant_id = TenantId::new(id);
        self.supervisor
            .register(&tenant_id, &format!("token-{id}"), None, "operator")
            .unwrap();
        tenant_id
    }

    fn tenant(&self, id: &TenantId) -> Tenant {
        self.store.get(id.as_str()).unwrap()
    }

    fn phase(&self, id: &TenantId) -> WorkerPhase {
        self.supervisor.status(id).phase
    }

    fn audit_actions(&self, id: &TenantId) -> Vec<AuditAction> {
        self.store
            .audit_for(id.as_str())
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    async fn start_running(&self, id: &TenantId) -> u32 {
        match self.supervisor.start(id, "operator").await.unwrap() {
            StartOutcome::Started { pid } => pid,
            other => panic!("expected a fresh start, got {other:?}"),
        }
    }
}

/// Poll until `cond` holds, failing after two seconds
async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
