// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake worker adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    ProcessControl, SpawnError, WorkerAdapter, WorkerEvent, WorkerExit, WorkerProcess,
    WorkerSender, WorkerSpawnConfig,
};
use crate::ipc::{ManagerMessage, WorkerMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// What a fake worker does right after it is spawned
#[derive(Debug, Clone, PartialEq)]
pub enum FakeStartup {
    /// Send `ready {guilds}`
    Ready(u32),
    /// Never send anything
    Silent,
    /// Send `error {message}`
    Error(String),
    /// Fail the spawn itself
    SpawnFails(String),
}

/// Scripted behaviour of a fake worker
#[derive(Debug, Clone)]
pub struct FakeWorkerScript {
    pub startup: FakeStartup,
    pub answers_health: bool,
    pub honours_shutdown: bool,
}

impl Default for FakeWorkerScript {
    fn default() -> Self {
        Self {
            startup: FakeStartup::Ready(3),
            answers_health: true,
            honours_shutdown: true,
        }
    }
}

impl FakeWorkerScript {
    pub fn ready(guilds: u32) -> Self {
        Self {
            startup: FakeStartup::Ready(guilds),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self {
            startup: FakeStartup::Silent,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            startup: FakeStartup::Error(message.to_string()),
            ..Self::default()
        }
    }

    pub fn spawn_fails(message: &str) -> Self {
        Self {
            startup: FakeStartup::SpawnFails(message.to_string()),
            ..Self::default()
        }
    }

    pub fn deaf(mut self) -> Self {
        self.answers_health = false;
        self.honours_shutdown = false;
        self
    }
}

/// Recorded adapter call
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCall {
    Spawn {
        tenant_id: String,
        env: Vec<(String, String)>,
    },
    Send {
        pid: u32,
        message: ManagerMessage,
    },
    Kill {
        pid: u32,
    },
}

struct FakeProcess {
    tenant_id: String,
    guilds: u32,
    events: mpsc::Sender<WorkerEvent>,
    exit: watch::Sender<Option<WorkerExit>>,
}

struct FakeWorkerState {
    scripts: HashMap<String, Vec<FakeWorkerScript>>,
    default_script: FakeWorkerScript,
    processes: HashMap<u32, FakeProcess>,
    calls: Vec<WorkerCall>,
    next_pid: u32,
}

impl FakeWorkerState {
    fn finish(&mut self, pid: u32, code: Option<i32>) {
        if let Some(process) = self.processes.remove(&pid) {
            let exit = WorkerExit { code };
            let _ = process.exit.send(Some(exit));
            let _ = process.events.try_send(WorkerEvent::Exited(exit));
        }
    }
}

/// Fake worker adapter for testing.
///
/// Each spawn consumes the next script queued for the tenant (falling back
/// to the default script) and runs a small task that plays the worker's
/// side of the IPC protocol.
#[derive(Clone)]
pub struct FakeWorkerAdapter {
    inner: Arc<Mutex<FakeWorkerState>>,
}

impl Default for FakeWorkerAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeWorkerState {
                scripts: HashMap::new(),
                default_script: FakeWorkerScript::default(),
                processes: HashMap::new(),
                calls: Vec::new(),
                next_pid: 1000,
            })),
        }
    }
}

impl FakeWorkerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default_script(&self, script: FakeWorkerScript) {
        self.inner.lock().default_script = script;
    }

    /// Queue a script for the tenant's next spawn
    pub fn push_script(&self, tenant_id: &str, script: FakeWorkerScript) {
        self.inner
            .lock()
            .scripts
            .entry(tenant_id.to_string())
            .or_default()
            .push(script);
    }

    pub fn calls(&self) -> Vec<WorkerCall> {
        self.inner.lock().calls.clone()
    }

    pub fn spawn_count(&self, tenant_id: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, WorkerCall::Spawn { tenant_id: t, .. } if t == tenant_id))
            .count()
    }

    /// Pids of live fake processes for a tenant
    pub fn live_pids(&self, tenant_id: &str) -> Vec<u32> {
        let mut pids: Vec<u32> = self
            .inner
            .lock()
            .processes
            .iter()
            .filter(|(_, p)| p.tenant_id == tenant_id)
            .map(|(pid, _)| *pid)
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Simulate an unexpected exit
    pub fn crash(&self, pid: u32, code: i32) {
        self.inner.lock().finish(pid, Some(code));
    }

    /// Simulate the worker reporting a fatal error without exiting
    pub fn report_error(&self, pid: u32, message: &str) {
        let inner = self.inner.lock();
        if let Some(process) = inner.processes.get(&pid) {
            let _ = process.events.try_send(WorkerEvent::Message(WorkerMessage::Error {
                message: message.to_string(),
                stack: None,
            }));
        }
    }
}

#[async_trait]
impl WorkerAdapter for FakeWorkerAdapter {
    async fn spawn(&self, config: WorkerSpawnConfig) -> Result<WorkerProcess, SpawnError> {
        let tenant_id = config.tenant_id.to_string();
        let mut inner = self.inner.lock();
        inner.calls.push(WorkerCall::Spawn {
            tenant_id: tenant_id.clone(),
            env: config.env.clone(),
        });

        let script = match inner.scripts.get_mut(&tenant_id) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => inner.default_script.clone(),
        };
        if let FakeStartup::SpawnFails(message) = &script.startup {
            return Err(SpawnError::Failed(message.clone()));
        }

        let pid = inner.next_pid;
        inner.next_pid += 1;

        let (msg_tx, mut msg_rx) = mpsc::channel::<ManagerMessage>(16);
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(64);
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let (exit_tx, exit_rx) = watch::channel(None);

        let guilds = match &script.startup {
            FakeStartup::Ready(guilds) => {
                let _ = event_tx.try_send(WorkerEvent::Message(WorkerMessage::Ready {
                    guilds: *guilds,
                }));
                *guilds
            }
            FakeStartup::Error(message) => {
                let _ = event_tx.try_send(WorkerEvent::Message(WorkerMessage::Error {
                    message: message.clone(),
                    stack: None,
                }));
                0
            }
            FakeStartup::Silent | FakeStartup::SpawnFails(_) => 0,
        };

        inner.processes.insert(
            pid,
            FakeProcess {
                tenant_id,
                guilds,
                events: event_tx,
                exit: exit_tx,
            },
        );
        drop(inner);

        let state = Arc::clone(&self.inner);
        let mut exited = exit_rx.clone();
        let started = tokio::time::Instant::now();
        tokio::spawn(async move {
            let mut inbox_open = true;
            loop {
                tokio::select! {
                    _ = exited.wait_for(Option::is_some) => break,
                    Some(()) = kill_rx.recv() => {
                        let mut inner = state.lock();
                        inner.calls.push(WorkerCall::Kill { pid });
                        inner.finish(pid, None);
                        break;
                    }
                    msg = msg_rx.recv(), if inbox_open => {
                        let Some(msg) = msg else {
                            inbox_open = false;
                            continue;
                        };
                        let mut inner = state.lock();
                        inner.calls.push(WorkerCall::Send { pid, message: msg });
                        match msg {
                            ManagerMessage::HealthRequest if script.answers_health => {
                                if let Some(process) = inner.processes.get(&pid) {
                                    let _ = process.events.try_send(WorkerEvent::Message(
                                        WorkerMessage::Health {
                                            guilds: process.guilds,
                                            uptime: started.elapsed().as_millis() as u64,
                                            memory: 48 * 1024 * 1024,
                                        },
                                    ));
                                }
                            }
                            ManagerMessage::Shutdown if script.honours_shutdown => {
                                inner.finish(pid, Some(0));
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
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
#[path = "fake_tests.rs"]
mod tests;
