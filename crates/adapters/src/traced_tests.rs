// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::{FakeWorkerAdapter, FakeWorkerScript, WorkerCall};
use fleet_core::TenantId;

fn config(tenant: &str) -> WorkerSpawnConfig {
    WorkerSpawnConfig {
        tenant_id: TenantId::new(tenant),
        program: "fleet-worker".into(),
        args: vec![],
        env: vec![("DISCORD_TOKEN".to_string(), "secret".to_string())],
    }
}

#[tokio::test]
async fn traced_spawn_delegates() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let fake = FakeWorkerAdapter::new();
    let traced = TracedWorkerAdapter::new(fake.clone());

    let process = traced.spawn(config("t1")).await.unwrap();

    assert_eq!(fake.live_pids("t1"), vec![process.pid]);
    assert!(matches!(&fake.calls()[0], WorkerCall::Spawn { tenant_id, .. } if tenant_id == "t1"));
}

#[tokio::test]
async fn traced_spawn_propagates_errors() {
    let fake = FakeWorkerAdapter::new();
    fake.push_script("t1", FakeWorkerScript::spawn_fails("denied"));
    let traced = TracedWorkerAdapter::new(fake);

    let result = traced.spawn(config("t1")).await;
    assert!(matches!(result, Err(SpawnError::Failed(ref m)) if m == "denied"));
}

#[test]
fn spawn_config_debug_hides_env_values() {
    let rendered = format!("{:?}", config("t1"));
    assert!(rendered.contains("DISCORD_TOKEN"));
    assert!(!rendered.contains("secret"));
}
