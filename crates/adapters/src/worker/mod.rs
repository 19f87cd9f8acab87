// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process adapters.
//!
//! A spawned worker is represented by a [`WorkerProcess`]: a sender for
//! manager messages, a receiver of worker events (messages, then a final
//! `Exited`), and a [`ProcessControl`] for force-killing and awaiting exit.

mod process;

pub use process::ProcessAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStartup, FakeWorkerAdapter, FakeWorkerScript, WorkerCall};

use crate::ipc::{ManagerMessage, WorkerMessage};
use async_trait::async_trait;
use fleet_core::TenantId;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Errors from spawning a worker
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("worker {0} pipe unavailable")]
    MissingPipe(&'static str),
    #[error("worker exited before reporting a pid")]
    NoPid,
    #[error("spawn failed: {0}")]
    Failed(String),
}

/// What to launch for one tenant
#[derive(Clone)]
pub struct WorkerSpawnConfig {
    pub tenant_id: TenantId,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Includes the decrypted credential; never log values
    pub env: Vec<(String, String)>,
}

impl std::fmt::Debug for WorkerSpawnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("WorkerSpawnConfig")
            .field("tenant_id", &self.tenant_id)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env_keys", &keys)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerExit {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Message(WorkerMessage),
    /// Always the last event on the stream
    Exited(WorkerExit),
}

/// Outbound half of the IPC channel
#[derive(Clone)]
pub struct WorkerSender {
    tx: mpsc::Sender<ManagerMessage>,
}

impl WorkerSender {
    pub fn new(tx: mpsc::Sender<ManagerMessage>) -> Self {
        Self { tx }
    }

    /// Queue a message; fails once the worker's stdin is gone.
    pub async fn send(&self, msg: ManagerMessage) -> Result<(), crate::ProtocolError> {
        self.tx.send(msg).await.map_err(|_| {
            crate::ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "worker channel closed",
            ))
        })
    }
}

/// Kill switch and exit status of one worker process
#[derive(Clone)]
pub struct ProcessControl {
    kill_tx: mpsc::Sender<()>,
    exit_rx: watch::Receiver<Option<WorkerExit>>,
}

impl ProcessControl {
    pub fn new(kill_tx: mpsc::Sender<()>, exit_rx: watch::Receiver<Option<WorkerExit>>) -> Self {
        Self { kill_tx, exit_rx }
    }

    /// Request a forced termination. Idempotent.
    pub fn kill(&self) {
        let _ = self.kill_tx.try_send(());
    }

    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    pub async fn wait_exit(&self) -> WorkerExit {
        let mut rx = self.exit_rx.clone();
        // The watch guard borrows `rx`; release it before returning
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).unwrap_or_default(),
            Err(_) => WorkerExit::default(),
        };
        exit
    }
}

/// A running worker
pub struct WorkerProcess {
    pub pid: u32,
    pub sender: WorkerSender,
    pub events: mpsc::Receiver<WorkerEvent>,
    pub control: ProcessControl,
}

/// Adapter for launching tenant workers
#[async_trait]
pub trait WorkerAdapter: Clone + Send + Sync + 'static {
    async fn spawn(&self, config: WorkerSpawnConfig) -> Result<WorkerProcess, SpawnError>;
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
