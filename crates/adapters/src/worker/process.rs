// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process worker adapter

use super::{
    ProcessControl, SpawnError, WorkerAdapter, WorkerEvent, WorkerExit, WorkerProcess,
    WorkerSender, WorkerSpawnConfig,
};
use crate::ipc::{self, Inbound, ManagerMessage, ProtocolError, WorkerMessage};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

/// How long to let the reader drain buffered frames after the child exits
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Spawns workers as local child processes talking NDJSON over stdio.
///
/// stdin/stdout carry IPC; stderr is inherited so worker logs land next to
/// the manager's.
#[derive(Clone, Default)]
pub struct ProcessAdapter;

impl ProcessAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkerAdapter for ProcessAdapter {
    async fn spawn(&self, config: WorkerSpawnConfig) -> Result<WorkerProcess, SpawnError> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SpawnError::Io {
            program: config.program.display().to_string(),
            source,
        })?;
        let pid = child.id().ok_or(SpawnError::NoPid)?;
        let mut stdin = child.stdin.take().ok_or(SpawnError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(SpawnError::MissingPipe("stdout"))?;

        let tenant_id = config.tenant_id.clone();
        let (msg_tx, mut msg_rx) = mpsc::channel::<ManagerMessage>(16);
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(64);
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let (exit_tx, exit_rx) = watch::channel(None);

        // Writer: manager messages → child stdin
        let writer_tenant = tenant_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = ipc::write_message(&mut stdin, &msg).await {
                    tracing::debug!(tenant_id = %writer_tenant, error = %e, "worker stdin closed");
                    break;
                }
            }
        });

        // Reader: child stdout → worker events
        let reader_tenant = tenant_id.clone();
        let reader_events = event_tx.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout);
            loop {
                match ipc::read_message::<_, WorkerMessage>(&mut lines).await {
                    Ok(Some(Inbound::Message(msg))) => {
                        if reader_events.send(WorkerEvent::Message(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Inbound::Unknown(kind))) => {
                        tracing::warn!(tenant_id = %reader_tenant, kind, "unknown worker message type");
                    }
                    Ok(None) => break,
                    Err(ProtocolError::Decode(e)) => {
                        tracing::warn!(tenant_id = %reader_tenant, error = %e, "skipping malformed worker frame");
                    }
                    Err(e) => {
                        tracing::warn!(tenant_id = %reader_tenant, error = %e, "worker stdout failed");
                        break;
                    }
                }
            }
        });

        // Waiter: exit status (natural or forced) → exit watch + final event
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Some(()) = kill_rx.recv() => {
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(tenant_id = %tenant_id, pid, error = %e, "kill failed");
                    }
                    child.wait().await
                }
            };
            let exit = WorkerExit {
                code: status.ok().and_then(|s| s.code()),
            };
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, reader).await;
            tracing::debug!(tenant_id = %tenant_id, pid, code = ?exit.code, "worker exited");
            let _ = exit_tx.send(Some(exit));
            let _ = event_tx.send(WorkerEvent::Exited(exit)).await;
        });

        Ok(WorkerProcess {
            pid,
            sender: WorkerSender::new(msg_tx),
            events: event_rx,
            control: ProcessControl::new(kill_tx, exit_rx),
        })
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
