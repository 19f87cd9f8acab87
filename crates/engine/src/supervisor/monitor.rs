// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker event pump, crash handling, health probes, automatic restarts

use super::lifecycle::exit_reason;
use super::Supervisor;
use crate::SupervisorError;
use fleet_adapters::{ManagerMessage, WorkerAdapter, WorkerEvent, WorkerMessage};
use fleet_core::{Clock, Event, HealthSnapshot, TenantId, WorkerPhase, SYSTEM_ACTOR};
use tokio::sync::{mpsc, oneshot};

impl<W: WorkerAdapter, C: Clock> Supervisor<W, C> {
    /// Send `health_request` to a RUNNING worker and wait for the reply.
    ///
    /// A worker that does not answer within the health timeout is treated
    /// as unresponsive: it is killed and handled as a crash.
    pub async fn health_probe(&self, tenant_id: &TenantId) -> Result<HealthSnapshot, SupervisorError> {
        let (sender, reply, generation) = {
            let mut workers = self.inner.workers.lock();
            let state = workers
                .get_mut(tenant_id)
                .filter(|s| s.phase == WorkerPhase::Running)
                .ok_or_else(|| SupervisorError::NotRunning(tenant_id.clone()))?;
            let generation = state.generation;
            let link = state
                .link
                .as_mut()
                .ok_or_else(|| SupervisorError::NotRunning(tenant_id.clone()))?;
            let (tx, rx) = oneshot::channel();
            link.health_waiters.push_back(tx);
            (link.sender.clone(), rx, generation)
        };

        if sender.send(ManagerMessage::HealthRequest).await.is_err() {
            return Err(SupervisorError::Upstream(
                "worker channel closed".to_string(),
            ));
        }

        let timeout = self.inner.config.health_timeout;
        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_)) => Err(SupervisorError::Upstream(
                "worker went away before answering health request".to_string(),
            )),
            Err(_) => {
                let reason = format!("health request timed out after {}ms", timeout.as_millis());
                self.handle_crash(tenant_id, generation, reason.clone(), true);
                Err(SupervisorError::Upstream(reason))
            }
        }
    }

    pub(crate) fn spawn_pump(
        &self,
        tenant_id: TenantId,
        generation: u64,
        mut events: mpsc::Receiver<WorkerEvent>,
    ) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    WorkerEvent::Message(WorkerMessage::Health {
                        guilds,
                        uptime,
                        memory,
                    }) => supervisor.record_health(&tenant_id, generation, guilds, uptime, memory),
                    WorkerEvent::Message(WorkerMessage::Ready { .. }) => {
                        tracing::debug!(tenant_id = %tenant_id, "duplicate ready ignored");
                    }
                    WorkerEvent::Message(WorkerMessage::Error { message, stack }) => {
                        tracing::debug!(tenant_id = %tenant_id, stack = ?stack, "worker error detail");
                        supervisor.handle_crash(
                            &tenant_id,
                            generation,
                            format!("worker reported error: {message}"),
                            true,
                        );
                    }
                    WorkerEvent::Exited(exit) => {
                        supervisor.handle_crash(
                            &tenant_id,
                            generation,
                            exit_reason("worker exited unexpectedly", exit),
                            false,
                        );
                        break;
                    }
                }
            }
        });
    }

    fn record_health(&self, tenant_id: &TenantId, generation: u64, guilds: u32, uptime: u64, memory: u64) {
        let mut workers = self.inner.workers.lock();
        let Some(state) = workers.get_mut(tenant_id) else {
            return;
        };
        if state.generation != generation {
            return;
        }
        let snapshot = HealthSnapshot {
            tenant_id: tenant_id.clone(),
            guild_count: u64::from(guilds),
            uptime_ms: uptime,
            memory_bytes: memory,
            observed_at: self.inner.clock.utc_now(),
        };
        state.last_health = Some(snapshot.clone());
        if let Some(link) = state.link.as_mut() {
            // Skip waiters whose probe already timed out
            while let Some(waiter) = link.health_waiters.pop_front() {
                if waiter.send(snapshot.clone()).is_ok() {
                    break;
                }
            }
        }
    }

    /// RUNNING → CRASHED. Events from older generations, or arriving while
    /// the worker is being stopped, are ignored.
    pub(crate) fn handle_crash(&self, tenant_id: &TenantId, generation: u64, reason: String, kill: bool) {
        let control = {
            let mut workers = self.inner.workers.lock();
            let Some(state) = workers.get_mut(tenant_id) else {
                return;
            };
            if state.generation != generation || state.phase != WorkerPhase::Running {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    phase = %state.phase,
                    reason = %reason,
                    "worker event outside RUNNING ignored"
                );
                return;
            }
            state.phase = WorkerPhase::Crashed;
            state.last_health = None;
            state.link.take().map(|link| link.control)
        };
        if kill {
            if let Some(control) = &control {
                control.kill();
            }
        }

        tracing::warn!(tenant_id = %tenant_id, reason = %reason, "worker crashed");
        self.inner.store.emit(Event::TenantFailed {
            id: tenant_id.clone(),
            error: reason,
            at: self.inner.clock.utc_now(),
        });
        self.schedule_restart(tenant_id);
    }

    fn schedule_restart(&self, tenant_id: &TenantId) {
        if self.is_shutting_down() {
            return;
        }
        let (attempt, generation) = {
            let mut workers = self.inner.workers.lock();
            let Some(state) = workers.get_mut(tenant_id) else {
                return;
            };
            let attempt = state.restart_count;
            if self.inner.config.backoff.delay_for(attempt).is_some() {
                state.restart_count += 1;
            }
            (attempt, state.generation)
        };
        let Some(delay) = self.inner.config.backoff.delay_for(attempt) else {
            tracing::warn!(
                tenant_id = %tenant_id,
                restarts = attempt,
                "restart budget exhausted, leaving worker crashed"
            );
            return;
        };

        tracing::info!(
            tenant_id = %tenant_id,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "scheduling worker restart"
        );
        let supervisor = self.clone();
        let tenant_id = tenant_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            supervisor.auto_restart(&tenant_id, generation).await;
        });
    }

    async fn auto_restart(&self, tenant_id: &TenantId, generation: u64) {
        let lock = self.op_lock(tenant_id);
        let _guard = lock.lock().await;
        if self.is_shutting_down() {
            return;
        }
        let current = self
            .inner
            .workers
            .lock()
            .get(tenant_id)
            .map(|s| (s.phase, s.generation));
        if current != Some((WorkerPhase::Crashed, generation)) {
            tracing::debug!(tenant_id = %tenant_id, "automatic restart superseded");
            return;
        }

        match self.start_locked(tenant_id, SYSTEM_ACTOR, false).await {
            Ok(outcome) => {
                tracing::info!(tenant_id = %tenant_id, ?outcome, "worker restarted");
            }
            Err(e @ (SupervisorError::Upstream(_) | SupervisorError::Integrity(_))) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "automatic restart failed");
                self.schedule_restart(tenant_id);
            }
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "automatic restart abandoned");
            }
        }
    }
}
