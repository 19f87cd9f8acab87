// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::TenantId;

fn sh(script: &str) -> WorkerSpawnConfig {
    WorkerSpawnConfig {
        tenant_id: TenantId::new("t1"),
        program: "sh".into(),
        args: vec!["-c".to_string(), script.to_string()],
        env: vec![("GUILDS".to_string(), "4".to_string())],
    }
}

async fn next(process: &mut WorkerProcess) -> WorkerEvent {
    tokio::time::timeout(Duration::from_secs(5), process.events.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn child_speaks_ndjson_over_stdio() {
    // Reports ready, answers one health request, exits on shutdown
    let script = r#"
        echo "{\"type\":\"ready\",\"data\":{\"guilds\":$GUILDS}}"
        read line
        echo '{"type":"health","data":{"guilds":4,"uptime":5,"memory":6}}'
        read line
        case "$line" in *shutdown*) exit 0 ;; esac
        exit 3
    "#;
    let mut process = ProcessAdapter::new().spawn(sh(script)).await.unwrap();
    assert!(process.pid > 0);

    assert_eq!(
        next(&mut process).await,
        WorkerEvent::Message(WorkerMessage::Ready { guilds: 4 })
    );

    process
        .sender
        .send(ManagerMessage::HealthRequest)
        .await
        .unwrap();
    assert_eq!(
        next(&mut process).await,
        WorkerEvent::Message(WorkerMessage::Health {
            guilds: 4,
            uptime: 5,
            memory: 6
        })
    );

    process.sender.send(ManagerMessage::Shutdown).await.unwrap();
    assert_eq!(
        next(&mut process).await,
        WorkerEvent::Exited(WorkerExit { code: Some(0) })
    );
    assert!(process.control.has_exited());
}

#[tokio::test]
async fn kill_terminates_unresponsive_child() {
    let mut process = ProcessAdapter::new().spawn(sh("sleep 30")).await.unwrap();
    assert!(!process.control.has_exited());

    process.control.kill();
    let exit = tokio::time::timeout(Duration::from_secs(5), process.control.wait_exit())
        .await
        .unwrap();

    assert_eq!(exit.code, None);
    assert_eq!(next(&mut process).await, WorkerEvent::Exited(exit));
}

#[tokio::test]
async fn garbage_output_is_skipped() {
    let script = r#"
        echo 'not json'
        echo '{"type":"telemetry"}'
        echo '{"type":"error","data":{"message":"bad token"}}'
    "#;
    let mut process = ProcessAdapter::new().spawn(sh(script)).await.unwrap();

    assert_eq!(
        next(&mut process).await,
        WorkerEvent::Message(WorkerMessage::Error {
            message: "bad token".to_string(),
            stack: None
        })
    );
    assert!(matches!(next(&mut process).await, WorkerEvent::Exited(_)));
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let config = WorkerSpawnConfig {
        tenant_id: TenantId::new("t1"),
        program: "/nonexistent/fleet-worker".into(),
        args: vec![],
        env: vec![],
    };
    let err = match ProcessAdapter::new().spawn(config).await {
        Err(e) => e,
        Ok(_) => panic!("spawn should fail"),
    };
    assert!(matches!(err, SpawnError::Io { .. }));
}
