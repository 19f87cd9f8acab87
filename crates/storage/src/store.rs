// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handle over the materialized tenant state.

use crate::journal::{self, JournalError, JournalWriter};
use crate::MaterializedState;
use fleet_core::{AuditLogEntry, Event, Tenant};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("journal writer is not running")]
    WriterStopped,
}

/// Tenant records and audit log, shared between the supervisor and the API.
///
/// [`emit`](Self::emit) applies the event in memory and, for a file-backed
/// store, queues it for the journal writer thread. No disk I/O happens on
/// the caller's thread. Write failures are logged there; the in-memory
/// state stays authoritative for the running process.
#[derive(Clone)]
pub struct TenantStore {
    state: Arc<Mutex<MaterializedState>>,
    journal: Option<Arc<JournalWriter>>,
}

impl TenantStore {
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(MaterializedState::default())),
            journal: None,
        }
    }

    /// Open a file-backed store: load the snapshot at `path`, replay its
    /// journal, and start the writer.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let recovered = journal::recover(path)?;
        if recovered.replayed > 0 {
            info!(
                path = %path.display(),
                replayed = recovered.replayed,
                "replayed journal entries"
            );
        }
        debug!(
            path = %path.display(),
            tenants = recovered.state.tenants.len(),
            seq = recovered.seq,
            "loaded tenant state"
        );
        let state = recovered.state.clone();
        let journal = JournalWriter::spawn(path, recovered)?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            journal: Some(Arc::new(journal)),
        })
    }

    pub fn emit(&self, event: Event) {
        debug!(event = event.name(), tenant_id = %event.tenant_id(), "applying event");
        let mut state = self.state.lock();
        state.apply_event(&event);
        // Queued under the state lock so the journal sees events in apply order
        if let Some(journal) = &self.journal {
            journal.append(event);
        }
    }

    /// Block until every emitted event is on disk and folded into the
    /// snapshot (no-op when in memory).
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        match &self.journal {
            None => Ok(()),
            Some(journal) if journal.checkpoint() => Ok(()),
            Some(_) => {
                warn!("checkpoint requested after journal writer stopped");
                Err(StoreError::WriterStopped)
            }
        }
    }

    pub fn get(&self, tenant_id: &str) -> Option<Tenant> {
        self.state.lock().tenant(tenant_id).cloned()
    }

    /// All tenants, ordered by id
    pub fn list(&self) -> Vec<Tenant> {
        let state = self.state.lock();
        let mut tenants: Vec<Tenant> = state.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        tenants
    }

    pub fn audit_for(&self, tenant_id: &str) -> Vec<AuditLogEntry> {
        self.state.lock().audit_for(tenant_id)
    }

    /// Tenants persisted as running by a previous manager process
    pub fn orphaned(&self) -> Vec<Tenant> {
        self.state
            .lock()
            .tenants
            .values()
            .filter(|t| t.is_running)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
