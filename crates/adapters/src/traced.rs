// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::worker::{SpawnError, WorkerAdapter, WorkerProcess, WorkerSpawnConfig};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any WorkerAdapter
#[derive(Clone)]
pub struct TracedWorkerAdapter<W> {
    inner: W,
}

impl<W> TracedWorkerAdapter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait]
impl<W: WorkerAdapter> WorkerAdapter for TracedWorkerAdapter<W> {
    async fn spawn(&self, config: WorkerSpawnConfig) -> Result<WorkerProcess, SpawnError> {
        let span = tracing::info_span!(
            "worker.spawn",
            tenant_id = %config.tenant_id,
            program = %config.program.display()
        );
        async {
            tracing::info!(env_count = config.env.len(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.spawn(config).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(process) => tracing::info!(pid = process.pid, elapsed_ms, "worker spawned"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "spawn failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
