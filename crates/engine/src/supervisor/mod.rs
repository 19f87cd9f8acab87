// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Supervisor.
//!
//! Owns the per-tenant [`WorkerState`] table. Every phase transition happens
//! here; the Control API and the health monitor only call the public
//! commands below.
//!
//! Locking: the table itself sits behind a `parking_lot` mutex that is never
//! held across an await. Commands for one tenant additionally take that
//! tenant's async op lock, so two `start` calls for the same tenant
//! serialize while calls for different tenants run concurrently.

mod lifecycle;
mod monitor;

use crate::{BackoffPolicy, SupervisorError};
use fleet_adapters::{ProcessControl, WorkerAdapter, WorkerSender};
use fleet_core::{
    AuditAction, AuditLogEntry, Clock, Event, HealthSnapshot, IdGen, SchemaName, Tenant, TenantId,
    UuidIdGen, VaultKey, WorkerPhase,
};
use fleet_storage::{StoreRouter, TenantStore};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Supervisor tuning
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub worker_program: PathBuf,
    pub worker_args: Vec<String>,
    /// `start` is refused once a tenant's error count reaches this
    pub error_ceiling: u32,
    pub ready_timeout: Duration,
    pub shutdown_grace: Duration,
    pub health_timeout: Duration,
    pub backoff: BackoffPolicy,
    /// Upstream client id for tenants that did not register their own
    pub default_client_id: Option<String>,
    /// Broker URL handed through to workers
    pub redis_url: Option<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_program: PathBuf::from("fleet-worker"),
            worker_args: Vec::new(),
            error_ceiling: 5,
            ready_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
            default_client_id: None,
            redis_url: None,
        }
    }
}

/// Collaborators the supervisor drives
pub struct SupervisorDeps<W, C> {
    pub adapter: W,
    pub store: TenantStore,
    pub router: Option<StoreRouter>,
    pub vault_key: VaultKey,
    pub clock: C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum StartOutcome {
    Started { pid: u32 },
    /// No-op: the tenant was already STARTING or RUNNING
    AlreadyRunning { pid: Option<u32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOutcome {
    pub pid: u32,
    /// Whether the grace period ran out and the worker was killed
    pub forced: bool,
}

/// Read-only view of one tenant's runtime state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub phase: WorkerPhase,
    pub pid: Option<u32>,
    pub restart_count: u32,
    /// Guild count from `ready`, superseded by the latest health snapshot
    pub guilds: Option<u32>,
    pub last_health: Option<HealthSnapshot>,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            phase: WorkerPhase::Stopped,
            pid: None,
            restart_count: 0,
            guilds: None,
            last_health: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub phases: BTreeMap<WorkerPhase, usize>,
    pub total_guilds: u64,
}

/// Live process attached to a worker state
pub(crate) struct WorkerLink {
    pub(crate) pid: u32,
    pub(crate) sender: WorkerSender,
    pub(crate) control: ProcessControl,
    pub(crate) ready_guilds: u32,
    pub(crate) health_waiters: VecDeque<oneshot::Sender<HealthSnapshot>>,
}

/// Per-tenant runtime record. Not persisted.
#[derive(Default)]
pub(crate) struct WorkerState {
    pub(crate) phase: WorkerPhase,
    pub(crate) restart_count: u32,
    pub(crate) last_health: Option<HealthSnapshot>,
    /// Bumped on every start attempt; stale tasks compare against it
    pub(crate) generation: u64,
    pub(crate) link: Option<WorkerLink>,
}

impl WorkerState {
    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            phase: self.phase,
            pid: self.link.as_ref().map(|l| l.pid),
            restart_count: self.restart_count,
            guilds: self
                .last_health
                .as_ref()
                .map(|h| h.guild_count.min(u64::from(u32::MAX)) as u32)
                .or(self.link.as_ref().map(|l| l.ready_guilds)),
            last_health: self.last_health.clone(),
        }
    }
}

pub(crate) struct SupervisorInner<W, C> {
    pub(crate) adapter: W,
    pub(crate) store: TenantStore,
    pub(crate) router: Option<StoreRouter>,
    pub(crate) vault_key: VaultKey,
    pub(crate) clock: C,
    pub(crate) config: SupervisorConfig,
    pub(crate) ids: UuidIdGen,
    pub(crate) workers: Mutex<HashMap<TenantId, WorkerState>>,
    op_locks: Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>,
    pub(crate) shutting_down: AtomicBool,
}

/// Cheap to clone; clones share one worker table.
pub struct Supervisor<W, C> {
    pub(crate) inner: Arc<SupervisorInner<W, C>>,
}

impl<W, C> Clone for Supervisor<W, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: WorkerAdapter, C: Clock> Supervisor<W, C> {
    pub fn new(deps: SupervisorDeps<W, C>, config: SupervisorConfig) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                adapter: deps.adapter,
                store: deps.store,
                router: deps.router,
                vault_key: deps.vault_key,
                clock: deps.clock,
                config,
                ids: UuidIdGen,
                workers: Mutex::new(HashMap::new()),
                op_locks: Mutex::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &TenantStore {
        &self.inner.store
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    pub fn status(&self, tenant_id: &TenantId) -> WorkerStatus {
        self.inner
            .workers
            .lock()
            .get(tenant_id)
            .map(WorkerState::status)
            .unwrap_or_default()
    }

    pub fn statuses(&self) -> HashMap<TenantId, WorkerStatus> {
        self.inner
            .workers
            .lock()
            .iter()
            .map(|(id, state)| (id.clone(), state.status()))
            .collect()
    }

    /// Tenants currently in the RUNNING phase
    pub fn running(&self) -> Vec<TenantId> {
        let mut ids: Vec<TenantId> = self
            .inner
            .workers
            .lock()
            .iter()
            .filter(|(_, s)| s.phase == WorkerPhase::Running)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Phase counts over every known tenant plus guilds across live workers
    pub fn summary(&self) -> FleetSummary {
        let mut phases = BTreeMap::new();
        let workers = self.inner.workers.lock();
        for tenant in self.inner.store.list() {
            let phase = workers
                .get(&tenant.id)
                .map(|s| s.phase)
                .unwrap_or_default();
            *phases.entry(phase).or_insert(0) += 1;
        }
        let total_guilds = workers
            .values()
            .filter(|s| s.phase == WorkerPhase::Running)
            .filter_map(|s| s.status().guilds)
            .map(u64::from)
            .sum();
        FleetSummary {
            phases,
            total_guilds,
        }
    }

    /// Register a tenant or replace its credential.
    ///
    /// An id whose schema already belongs to a different tenant is refused,
    /// so two tenants never share a datastore partition.
    pub fn register(
        &self,
        tenant_id: &TenantId,
        token: &str,
        client_id: Option<String>,
        actor: &str,
    ) -> Result<Tenant, SupervisorError> {
        let Some(schema) = SchemaName::for_tenant(tenant_id) else {
            return Err(SupervisorError::InvalidTenantId(tenant_id.to_string()));
        };
        if let Some(owner) = self.schema_owner(&schema).filter(|owner| owner != tenant_id) {
            tracing::warn!(tenant_id = %tenant_id, owner = %owner, schema = %schema, "schema already claimed");
            return Err(SupervisorError::SchemaCollision {
                tenant_id: tenant_id.clone(),
                owner,
            });
        }
        let encrypted_credential = fleet_core::vault::encrypt(token.as_bytes(), &self.inner.vault_key)
            .map_err(|e| SupervisorError::Upstream(e.to_string()))?;
        self.inner.store.emit(Event::TenantRegistered {
            id: tenant_id.clone(),
            encrypted_credential,
            client_id,
            at: self.inner.clock.utc_now(),
        });
        self.audit(tenant_id, actor, AuditAction::TenantRegistered);
        tracing::info!(tenant_id = %tenant_id, "tenant registered");
        self.inner
            .store
            .get(tenant_id.as_str())
            .ok_or_else(|| SupervisorError::TenantNotFound(tenant_id.clone()))
    }

    /// Clear the error counter so a blocked tenant may start again.
    pub fn reset_errors(&self, tenant_id: &TenantId, actor: &str) -> Result<Tenant, SupervisorError> {
        if self.inner.store.get(tenant_id.as_str()).is_none() {
            return Err(SupervisorError::TenantNotFound(tenant_id.clone()));
        }
        self.inner.store.emit(Event::TenantErrorsCleared {
            id: tenant_id.clone(),
        });
        self.audit(tenant_id, actor, AuditAction::TenantErrorsCleared);
        tracing::info!(tenant_id = %tenant_id, "tenant errors cleared");
        self.inner
            .store
            .get(tenant_id.as_str())
            .ok_or_else(|| SupervisorError::TenantNotFound(tenant_id.clone()))
    }

    /// Mark tenants left running by a previous manager as stopped. Their
    /// children cannot be re-attached. Returns the reconciled ids.
    pub fn reconcile_orphans(&self) -> Vec<TenantId> {
        let orphans = self.inner.store.orphaned();
        let mut ids = Vec::with_capacity(orphans.len());
        for tenant in orphans {
            tracing::warn!(
                tenant_id = %tenant.id,
                pid = ?tenant.process_id,
                "tenant was running under a previous manager, marking stopped"
            );
            self.inner.store.emit(Event::TenantStopped {
                id: tenant.id.clone(),
                at: self.inner.clock.utc_now(),
            });
            ids.push(tenant.id);
        }
        ids
    }

    /// Registered or routed tenant whose ids sanitise to `schema`
    fn schema_owner(&self, schema: &SchemaName) -> Option<TenantId> {
        if let Some(owner) = self.inner.router.as_ref().and_then(|r| r.owner_of(schema)) {
            return Some(owner);
        }
        self.inner
            .store
            .list()
            .into_iter()
            .map(|tenant| tenant.id)
            .find(|id| SchemaName::for_tenant(id).as_ref() == Some(schema))
    }

    pub(crate) fn audit(&self, tenant_id: &TenantId, actor: &str, action: AuditAction) {
        self.inner.store.emit(Event::AuditRecorded {
            entry: AuditLogEntry {
                id: self.inner.ids.next(),
                tenant_id: tenant_id.clone(),
                user_id: actor.to_string(),
                action,
                timestamp: self.inner.clock.utc_now(),
            },
        });
    }

    pub(crate) fn op_lock(&self, tenant_id: &TenantId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.inner
                .op_locks
                .lock()
                .entry(tenant_id.clone())
                .or_default(),
        )
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "../supervisor_tests/mod.rs"]
mod tests;
