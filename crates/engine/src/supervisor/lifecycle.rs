// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! start / stop / restart transitions

use super::{StartOutcome, StopOutcome, Supervisor, WorkerLink};
use crate::SupervisorError;
use fleet_adapters::{
    ManagerMessage, WorkerAdapter, WorkerEvent, WorkerExit, WorkerMessage, WorkerProcess,
    WorkerSpawnConfig,
};
use fleet_core::worker::env;
use fleet_core::{vault, AuditAction, Clock, Event, Tenant, TenantId, WorkerPhase, SYSTEM_ACTOR};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// How long to wait for a killed worker to be reaped
const KILL_WAIT: Duration = Duration::from_secs(5);

pub(crate) fn exit_reason(prefix: &str, exit: WorkerExit) -> String {
    match exit.code {
        Some(code) => format!("{prefix} (exit code {code})"),
        None => format!("{prefix} (killed by signal)"),
    }
}

/// Run a transition on its own task. Dropping the caller's future (a
/// client hanging up mid-request) leaves the transition running to a
/// settled phase instead of stranding it in STARTING or STOPPING.
async fn detached<T, F>(transition: F) -> Result<T, SupervisorError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, SupervisorError>> + Send + 'static,
{
    tokio::spawn(transition)
        .await
        .map_err(|e| SupervisorError::Upstream(format!("supervisor task failed: {e}")))?
}

impl<W: WorkerAdapter, C: Clock> Supervisor<W, C> {
    /// Start a tenant's worker and wait for it to report `ready`.
    ///
    /// A tenant that is already STARTING or RUNNING is left alone and
    /// reported as [`StartOutcome::AlreadyRunning`].
    pub async fn start(
        &self,
        tenant_id: &TenantId,
        actor: &str,
    ) -> Result<StartOutcome, SupervisorError> {
        let supervisor = self.clone();
        let tenant_id = tenant_id.clone();
        let actor = actor.to_string();
        detached(async move {
            let lock = supervisor.op_lock(&tenant_id);
            let _guard = lock.lock().await;
            supervisor.start_locked(&tenant_id, &actor, true).await
        })
        .await
    }

    /// Ask a RUNNING worker to shut down, killing it after the grace period.
    pub async fn stop(
        &self,
        tenant_id: &TenantId,
        actor: &str,
    ) -> Result<StopOutcome, SupervisorError> {
        let supervisor = self.clone();
        let tenant_id = tenant_id.clone();
        let actor = actor.to_string();
        detached(async move {
            let lock = supervisor.op_lock(&tenant_id);
            let _guard = lock.lock().await;
            supervisor.stop_locked(&tenant_id, &actor).await
        })
        .await
    }

    /// Stop then start. A tenant that was not running is simply started.
    pub async fn restart(
        &self,
        tenant_id: &TenantId,
        actor: &str,
    ) -> Result<StartOutcome, SupervisorError> {
        let supervisor = self.clone();
        let tenant_id = tenant_id.clone();
        let actor = actor.to_string();
        detached(async move {
            let lock = supervisor.op_lock(&tenant_id);
            let _guard = lock.lock().await;
            match supervisor.stop_locked(&tenant_id, &actor).await {
                Ok(_) | Err(SupervisorError::NotRunning(_)) => {}
                Err(e) => return Err(e),
            }
            supervisor.start_locked(&tenant_id, &actor, true).await
        })
        .await
    }

    /// Stop every running worker and cancel pending restarts. Workers still
    /// starting are killed. Returns how many workers stopped cleanly.
    pub async fn shutdown_all(&self) -> usize {
        self.inner.shutting_down.store(true, Ordering::Release);
        let running = self.running();
        let results =
            futures_util::future::join_all(running.iter().map(|id| self.stop(id, SYSTEM_ACTOR)))
                .await;

        let mut stopped = 0;
        for (id, result) in running.iter().zip(results) {
            match result {
                Ok(_) => stopped += 1,
                Err(e) => tracing::warn!(tenant_id = %id, error = %e, "stop during shutdown failed"),
            }
        }

        for (id, state) in self.inner.workers.lock().iter() {
            if let Some(link) = &state.link {
                tracing::warn!(tenant_id = %id, pid = link.pid, phase = %state.phase, "killing worker at shutdown");
                link.control.kill();
            }
        }
        stopped
    }

    pub(crate) async fn start_locked(
        &self,
        tenant_id: &TenantId,
        actor: &str,
        reset_restarts: bool,
    ) -> Result<StartOutcome, SupervisorError> {
        if let Some(state) = self.inner.workers.lock().get(tenant_id) {
            if matches!(state.phase, WorkerPhase::Running | WorkerPhase::Starting) {
                return Ok(StartOutcome::AlreadyRunning {
                    pid: state.link.as_ref().map(|l| l.pid),
                });
            }
        }

        let tenant = self
            .inner
            .store
            .get(tenant_id.as_str())
            .ok_or_else(|| SupervisorError::TenantNotFound(tenant_id.clone()))?;
        let ceiling = self.inner.config.error_ceiling;
        if tenant.is_blocked(ceiling) {
            return Err(SupervisorError::ErrorCeiling {
                tenant_id: tenant_id.clone(),
                count: tenant.error_count,
                ceiling,
            });
        }

        {
            let mut workers = self.inner.workers.lock();
            let state = workers.entry(tenant_id.clone()).or_default();
            state.phase = WorkerPhase::Starting;
            state.generation += 1;
            state.link = None;
            state.last_health = None;
            if reset_restarts {
                state.restart_count = 0;
            }
        }
        tracing::info!(tenant_id = %tenant_id, actor, "starting worker");
        let started = Instant::now();

        let token = match vault::decrypt_string(&tenant.encrypted_credential, &self.inner.vault_key)
        {
            Ok(token) => token,
            Err(e) => {
                self.fail_start(tenant_id, format!("credential rejected: {e}"));
                return Err(SupervisorError::Integrity(tenant_id.clone()));
            }
        };

        let config = match self.spawn_config(&tenant, token) {
            Ok(config) => config,
            Err(reason) => {
                self.fail_start(tenant_id, reason.clone());
                return Err(SupervisorError::Upstream(reason));
            }
        };

        let mut process = match self.inner.adapter.spawn(config).await {
            Ok(process) => process,
            Err(e) => {
                let reason = format!("spawn failed: {e}");
                self.fail_start(tenant_id, reason.clone());
                return Err(SupervisorError::Upstream(reason));
            }
        };

        let guilds = match self.await_ready(&mut process).await {
            Ok(guilds) => guilds,
            Err(reason) => {
                process.control.kill();
                self.fail_start(tenant_id, reason.clone());
                return Err(SupervisorError::Upstream(reason));
            }
        };

        let WorkerProcess {
            pid,
            sender,
            events,
            control,
        } = process;
        let generation = {
            let mut workers = self.inner.workers.lock();
            let state = workers.entry(tenant_id.clone()).or_default();
            state.phase = WorkerPhase::Running;
            state.link = Some(WorkerLink {
                pid,
                sender,
                control,
                ready_guilds: guilds,
                health_waiters: VecDeque::new(),
            });
            state.generation
        };
        self.inner.store.emit(Event::TenantStarted {
            id: tenant_id.clone(),
            pid,
            at: self.inner.clock.utc_now(),
        });
        self.audit(tenant_id, actor, AuditAction::TenantStarted);
        self.spawn_pump(tenant_id.clone(), generation, events);

        tracing::info!(
            tenant_id = %tenant_id,
            pid,
            guilds,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "worker ready"
        );
        Ok(StartOutcome::Started { pid })
    }

    pub(crate) async fn stop_locked(
        &self,
        tenant_id: &TenantId,
        actor: &str,
    ) -> Result<StopOutcome, SupervisorError> {
        if self.inner.store.get(tenant_id.as_str()).is_none() {
            return Err(SupervisorError::TenantNotFound(tenant_id.clone()));
        }

        let (pid, sender, control) = {
            let mut workers = self.inner.workers.lock();
            let state = workers
                .get_mut(tenant_id)
                .filter(|s| s.phase == WorkerPhase::Running)
                .ok_or_else(|| SupervisorError::NotRunning(tenant_id.clone()))?;
            let link = state
                .link
                .as_ref()
                .ok_or_else(|| SupervisorError::NotRunning(tenant_id.clone()))?;
            let parts = (link.pid, link.sender.clone(), link.control.clone());
            state.phase = WorkerPhase::Stopping;
            parts
        };
        tracing::info!(tenant_id = %tenant_id, pid, actor, "stopping worker");

        if let Err(e) = sender.send(ManagerMessage::Shutdown).await {
            tracing::debug!(tenant_id = %tenant_id, error = %e, "shutdown not delivered");
        }

        let grace = self.inner.config.shutdown_grace;
        let forced = match tokio::time::timeout(grace, control.wait_exit()).await {
            Ok(exit) => {
                tracing::debug!(tenant_id = %tenant_id, pid, code = ?exit.code, "worker exited");
                false
            }
            Err(_) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    pid,
                    grace_ms = grace.as_millis() as u64,
                    "shutdown grace expired, killing worker"
                );
                control.kill();
                if tokio::time::timeout(KILL_WAIT, control.wait_exit()).await.is_err() {
                    tracing::error!(tenant_id = %tenant_id, pid, "worker not reaped after kill");
                }
                true
            }
        };

        if let Some(state) = self.inner.workers.lock().get_mut(tenant_id) {
            state.phase = WorkerPhase::Stopped;
            state.link = None;
            state.last_health = None;
        }
        self.inner.store.emit(Event::TenantStopped {
            id: tenant_id.clone(),
            at: self.inner.clock.utc_now(),
        });
        self.audit(tenant_id, actor, AuditAction::TenantStopped);
        if let Some(router) = &self.inner.router {
            router.disconnect(tenant_id);
        }

        Ok(StopOutcome { pid, forced })
    }

    /// Record a failed start: phase CRASHED, tenant ERROR with one more error.
    fn fail_start(&self, tenant_id: &TenantId, reason: String) {
        if let Some(state) = self.inner.workers.lock().get_mut(tenant_id) {
            state.phase = WorkerPhase::Crashed;
            state.link = None;
        }
        tracing::warn!(tenant_id = %tenant_id, reason = %reason, "worker start failed");
        self.inner.store.emit(Event::TenantFailed {
            id: tenant_id.clone(),
            error: reason,
            at: self.inner.clock.utc_now(),
        });
    }

    async fn await_ready(&self, process: &mut WorkerProcess) -> Result<u32, String> {
        let timeout = self.inner.config.ready_timeout;
        let wait = async {
            while let Some(event) = process.events.recv().await {
                match event {
                    WorkerEvent::Message(WorkerMessage::Ready { guilds }) => return Ok(guilds),
                    WorkerEvent::Message(WorkerMessage::Error { message, .. }) => {
                        return Err(format!("worker reported error: {message}"));
                    }
                    WorkerEvent::Message(WorkerMessage::Health { .. }) => {}
                    WorkerEvent::Exited(exit) => {
                        return Err(exit_reason("worker exited before ready", exit));
                    }
                }
            }
            Err("worker channel closed before ready".to_string())
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "worker did not report ready within {}ms",
                timeout.as_millis()
            )),
        }
    }

    fn spawn_config(&self, tenant: &Tenant, token: String) -> Result<WorkerSpawnConfig, String> {
        let config = &self.inner.config;
        let mut vars = vec![
            (env::TENANT_ID.to_string(), tenant.id.to_string()),
            (env::TOKEN.to_string(), token),
        ];
        if let Some(client_id) = tenant
            .client_id
            .as_ref()
            .or(config.default_client_id.as_ref())
        {
            vars.push((env::CLIENT_ID.to_string(), client_id.clone()));
        }
        if let Some(router) = &self.inner.router {
            let handle = router.route_for(&tenant.id).map_err(|e| e.to_string())?;
            vars.push((
                env::DATABASE_URL.to_string(),
                handle.connection_url().to_string(),
            ));
        }
        if let Some(redis_url) = &config.redis_url {
            vars.push((env::REDIS_URL.to_string(), redis_url.clone()));
        }

        Ok(WorkerSpawnConfig {
            tenant_id: tenant.id.clone(),
            program: config.worker_program.clone(),
            args: config.worker_args.clone(),
            env: vars,
        })
    }
}
