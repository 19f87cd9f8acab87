// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the fleet manager: tenant records, the audit log,
//! and per-tenant database routing.

mod journal;
mod router;
mod snapshot;
mod state;
mod store;

pub use journal::JournalError;
pub use router::{RouterError, StoreHandle, StoreRouter};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use store::{StoreError, TenantStore};
