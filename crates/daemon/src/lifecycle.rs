// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use fleet_adapters::{ProcessAdapter, TracedWorkerAdapter, WorkerAdapter};
use fleet_core::{Clock, SystemClock};
use fleet_engine::{HealthMonitor, Supervisor, SupervisorDeps};
use fleet_storage::{StoreRouter, TenantStore};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{self, ApiAuth, ApiState, RateLimiter};
use crate::config::{Config, ConfigError};

/// Worker adapter used by the real daemon (wrapped with tracing)
pub type DaemonAdapter = TracedWorkerAdapter<ProcessAdapter>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: fleetd already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] fleet_storage::StoreError),

    #[error("Router error: {0}")]
    Router(#[from] fleet_storage::RouterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation.
pub struct Daemon<W, C> {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub supervisor: Supervisor<W, C>,
    pub store: TenantStore,
    pub router: Option<StoreRouter>,
    pub clock: C,
    /// When daemon started
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon plus the bound API listener.
pub struct StartupResult<W, C> {
    pub daemon: Daemon<W, C>,
    pub listener: TcpListener,
    /// Tenants found running under a previous manager and marked stopped
    pub reconciled: usize,
}

/// Start the daemon with real child processes.
pub async fn startup(
    config: &Config,
) -> Result<StartupResult<DaemonAdapter, SystemClock>, LifecycleError> {
    startup_with(
        config,
        TracedWorkerAdapter::new(ProcessAdapter::new()),
        SystemClock,
    )
    .await
}

/// Start the daemon with the given adapter and clock.
pub async fn startup_with<W: WorkerAdapter, C: Clock>(
    config: &Config,
    adapter: W,
    clock: C,
) -> Result<StartupResult<W, C>, LifecycleError> {
    match startup_inner(config, adapter, clock).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // The lock file belongs to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner<W: WorkerAdapter, C: Clock>(
    config: &Config,
    adapter: W,
    clock: C,
) -> Result<StartupResult<W, C>, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST. Open without truncating so a running
    //    daemon's PID survives a failed attempt.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Load tenants from the last snapshot
    let store = TenantStore::open(&config.snapshot_path)?;
    info!(
        tenants = store.list().len(),
        path = %config.snapshot_path.display(),
        "loaded tenant state"
    );

    // 4. Tenant store router
    let router = match &config.database_url {
        Some(url) => Some(StoreRouter::new(url)?),
        None => {
            warn!("DATABASE_URL not set, workers start without a datastore URL");
            None
        }
    };

    // 5. Supervisor
    let supervisor = Supervisor::new(
        SupervisorDeps {
            adapter,
            store: store.clone(),
            router: router.clone(),
            vault_key: config.secrets.encryption_key.clone(),
            clock: clock.clone(),
        },
        config.supervisor_config(),
    );

    // 6. Children of a previous manager cannot be re-attached
    let reconciled = supervisor.reconcile_orphans().len();
    if reconciled > 0 {
        warn!(count = reconciled, "marked orphaned tenants stopped");
    }

    // 7. Bind LAST, only after everything else is valid
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen_addr, e))?;

    info!("fleetd started");

    Ok(StartupResult {
        daemon: Daemon {
            config: config.clone(),
            lock_file,
            supervisor,
            store,
            router,
            start_time: clock.now(),
            clock,
        },
        listener,
        reconciled,
    })
}

impl<W: WorkerAdapter, C: Clock> Daemon<W, C> {
    pub fn api_state(&self) -> ApiState<W, C> {
        ApiState {
            supervisor: self.supervisor.clone(),
            auth: Arc::new(ApiAuth {
                api_key: self.config.secrets.api_key.clone(),
                hmac_secret: self.config.secrets.hmac_secret.clone(),
            }),
            limiter: Arc::new(
                RateLimiter::new(self.config.rate_limit, self.config.rate_window)
                    .with_total(self.config.rate_limit_total),
            ),
            clock: self.clock.clone(),
            started_at: self.start_time,
        }
    }

    pub fn api_router(&self) -> axum::Router {
        api::router(
            self.api_state(),
            &self.config.base_path,
            &self.config.cors_origins,
        )
    }

    pub fn health_monitor(&self) -> HealthMonitor<W, C> {
        HealthMonitor::new(self.supervisor.clone(), self.config.health_interval)
    }

    /// Stop every worker, close datastore handles, save a final snapshot
    /// and release the lock.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down fleetd...");

        let stopped = self.supervisor.shutdown_all().await;
        info!(stopped, "workers stopped");

        if let Some(router) = &self.router {
            router.disconnect_all();
        }

        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.checkpoint()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to save shutdown snapshot: {}", e),
            Err(e) => warn!("Shutdown snapshot task failed: {}", e),
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock released when self.lock_file drops
        info!("fleetd shutdown complete");
        Ok(())
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// PID recorded by a running daemon, if any
pub fn read_pid(lock_path: &Path) -> Option<u32> {
    std::fs::read_to_string(lock_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
