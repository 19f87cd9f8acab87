// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health Monitor: periodic `health_request` sweep over running workers

use crate::Supervisor;
use fleet_adapters::WorkerAdapter;
use fleet_core::{Clock, TenantId};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Result of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HealthSweep {
    pub healthy: Vec<TenantId>,
    pub failed: Vec<TenantId>,
}

pub struct HealthMonitor<W, C> {
    supervisor: Supervisor<W, C>,
    interval: Duration,
}

impl<W: WorkerAdapter, C: Clock> HealthMonitor<W, C> {
    pub fn new(supervisor: Supervisor<W, C>, interval: Duration) -> Self {
        Self {
            supervisor,
            interval,
        }
    }

    /// Probe every RUNNING worker concurrently. Unresponsive workers are
    /// handled by the supervisor as crashes.
    pub async fn sweep(&self) -> HealthSweep {
        let running = self.supervisor.running();
        let probes = running.iter().map(|id| self.supervisor.health_probe(id));
        let results = futures_util::future::join_all(probes).await;

        let mut sweep = HealthSweep::default();
        for (id, result) in running.into_iter().zip(results) {
            match result {
                Ok(snapshot) => {
                    tracing::trace!(
                        tenant_id = %id,
                        guilds = snapshot.guild_count,
                        uptime_ms = snapshot.uptime_ms,
                        memory_bytes = snapshot.memory_bytes,
                        "health ok"
                    );
                    sweep.healthy.push(id);
                }
                Err(e) => {
                    tracing::warn!(tenant_id = %id, error = %e, "health probe failed");
                    sweep.failed.push(id);
                }
            }
        }
        sweep
    }

    /// Sweep every `interval` until `shutdown` flips to true.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let sweep = self.sweep().await;
                        if !sweep.failed.is_empty() {
                            tracing::info!(
                                healthy = sweep.healthy.len(),
                                failed = sweep.failed.len(),
                                "health sweep"
                            );
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("health monitor stopped");
        })
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
