// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session::IdleSession;
use async_trait::async_trait;
use fleet_core::{FakeClock, TenantId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

const FAKE_MEMORY: u64 = 48 * 1024 * 1024;

fn test_env() -> WorkerEnv {
    WorkerEnv {
        tenant_id: TenantId::new("t1"),
        token: "token-t1".to_string(),
        client_id: None,
        database_url: None,
        redis_url: None,
    }
}

#[derive(Default)]
struct ScriptedSession {
    guilds: u32,
    login_error: Option<String>,
    fatal_after_login: Option<String>,
    logged_out: Arc<AtomicBool>,
}

#[async_trait]
impl BotSession for ScriptedSession {
    async fn login(&mut self, _env: &WorkerEnv, fatal: FatalReporter) -> Result<u32, SessionError> {
        if let Some(message) = &self.login_error {
            return Err(SessionError::new(message.clone()));
        }
        if let Some(message) = &self.fatal_after_login {
            fatal.report(SessionError::new(message.clone()));
        }
        Ok(self.guilds)
    }

    fn guild_count(&self) -> u32 {
        self.guilds
    }

    async fn logout(&mut self) {
        self.logged_out.store(true, Ordering::SeqCst);
    }
}

/// Manager end of the worker's stdio
struct Manager {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    worker: JoinHandle<Result<ExitReason, WorkerError>>,
}

impl Manager {
    async fn send(&mut self, message: ManagerMessage) {
        ipc::write_message(&mut self.writer, &message).await.unwrap();
    }

    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> WorkerMessage {
        let next = tokio::time::timeout(
            Duration::from_secs(2),
            ipc::read_message::<_, WorkerMessage>(&mut self.reader),
        )
        .await
        .unwrap()
        .unwrap();
        match next {
            Some(Inbound::Message(message)) => message,
            other => panic!("expected a worker message, got {other:?}"),
        }
    }

    async fn exit(self) -> Result<ExitReason, WorkerError> {
        tokio::time::timeout(Duration::from_secs(2), self.worker)
            .await
            .unwrap()
            .unwrap()
    }
}

fn launch<S: BotSession>(session: S, clock: FakeClock) -> Manager {
    let (worker_side, manager_side) = tokio::io::duplex(4096);
    let runtime = WorkerRuntime::new(test_env(), session, clock).with_memory_probe(|| FAKE_MEMORY);
    let worker = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(worker_side);
        let mut read = BufReader::new(read);
        runtime.run(&mut read, &mut write).await
    });
    let (read, writer) = tokio::io::split(manager_side);
    Manager {
        reader: BufReader::new(read),
        writer,
        worker,
    }
}

#[tokio::test]
async fn ready_health_then_graceful_shutdown() {
    let clock = FakeClock::new();
    let logged_out = Arc::new(AtomicBool::new(false));
    let mut manager = launch(
        ScriptedSession {
            guilds: 5,
            logged_out: Arc::clone(&logged_out),
            ..Default::default()
        },
        clock.clone(),
    );

    assert_eq!(manager.recv().await, WorkerMessage::Ready { guilds: 5 });

    clock.advance(Duration::from_millis(2500));
    manager.send(ManagerMessage::HealthRequest).await;
    assert_eq!(
        manager.recv().await,
        WorkerMessage::Health {
            guilds: 5,
            uptime: 2500,
            memory: FAKE_MEMORY
        }
    );

    manager.send(ManagerMessage::Shutdown).await;
    assert_eq!(manager.exit().await.unwrap(), ExitReason::Shutdown);
    assert!(logged_out.load(Ordering::SeqCst));
}

#[tokio::test]
async fn login_failure_is_reported_before_exit() {
    let mut manager = launch(
        ScriptedSession {
            login_error: Some("invalid token".to_string()),
            ..Default::default()
        },
        FakeClock::new(),
    );

    match manager.recv().await {
        WorkerMessage::Error { message, .. } => assert_eq!(message, "invalid token"),
        other => panic!("expected error frame, got {other:?}"),
    }
    assert!(matches!(manager.exit().await, Err(WorkerError::Login(_))));
}

#[tokio::test]
async fn fatal_session_error_follows_ready() {
    let logged_out = Arc::new(AtomicBool::new(false));
    let mut manager = launch(
        ScriptedSession {
            guilds: 2,
            fatal_after_login: Some("gateway closed: 4004".to_string()),
            logged_out: Arc::clone(&logged_out),
            ..Default::default()
        },
        FakeClock::new(),
    );

    assert_eq!(manager.recv().await, WorkerMessage::Ready { guilds: 2 });
    match manager.recv().await {
        WorkerMessage::Error { message, stack } => {
            assert_eq!(message, "gateway closed: 4004");
            assert!(stack.is_none());
        }
        other => panic!("expected error frame, got {other:?}"),
    }
    assert!(matches!(manager.exit().await, Err(WorkerError::Fatal(_))));
    assert!(logged_out.load(Ordering::SeqCst));
}

#[tokio::test]
async fn closed_stdin_means_manager_gone() {
    let mut manager = launch(IdleSession::default(), FakeClock::new());
    assert_eq!(manager.recv().await, WorkerMessage::Ready { guilds: 0 });

    manager.writer.shutdown().await.unwrap();

    assert_eq!(manager.exit().await.unwrap(), ExitReason::ManagerGone);
}

#[tokio::test]
async fn stray_input_is_ignored() {
    for line in ["{\"type\":\"reload\",\"data\":{}}\n", "hello\n", "\n"] {
        let mut manager = launch(
            ScriptedSession {
                guilds: 1,
                ..Default::default()
            },
            FakeClock::new(),
        );
        manager.recv().await;

        manager.send_raw(line).await;
        manager.send(ManagerMessage::HealthRequest).await;

        assert!(
            matches!(manager.recv().await, WorkerMessage::Health { guilds: 1, .. }),
            "after {line:?}"
        );
        manager.send(ManagerMessage::Shutdown).await;
        assert_eq!(manager.exit().await.unwrap(), ExitReason::Shutdown);
    }
}
