// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::vault::{self, VaultKey};
use crate::{Event, TenantId};
use chrono::{DateTime, Utc};

/// Fixed key used by every test vault
pub fn test_vault_key() -> VaultKey {
    VaultKey::from_bytes([0x42; 32])
}

/// Encrypt a token with [`test_vault_key`]
pub fn encrypted_token(token: &str) -> String {
    vault::encrypt(token.as_bytes(), &test_vault_key()).unwrap_or_default()
}

fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_728_000_000, 0).unwrap_or_default()
}

// ── Event factory functions ─────────────────────────────────────────────────

pub fn tenant_registered_event(id: &str) -> Event {
    Event::TenantRegistered {
        id: TenantId::new(id),
        encrypted_credential: encrypted_token(&format!("token-{id}")),
        client_id: None,
        at: epoch(),
    }
}

pub fn tenant_started_event(id: &str, pid: u32) -> Event {
    Event::TenantStarted {
        id: TenantId::new(id),
        pid,
        at: epoch(),
    }
}

pub fn tenant_stopped_event(id: &str) -> Event {
    Event::TenantStopped {
        id: TenantId::new(id),
        at: epoch(),
    }
}

pub fn tenant_failed_event(id: &str, error: &str) -> Event {
    Event::TenantFailed {
        id: TenantId::new(id),
        error: error.to_string(),
        at: epoch(),
    }
}
