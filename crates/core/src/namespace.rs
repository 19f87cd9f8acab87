// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant storage namespace derivation and the [`SchemaName`] newtype.

use crate::id::TenantId;

/// Prefix of every tenant schema
pub const SCHEMA_PREFIX: &str = "tenant_";

/// A tenant-scoped datastore namespace (schema) name.
///
/// Only ever contains `[A-Za-z0-9_]`, so it can be spliced into a
/// connection string or an identifier without quoting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SchemaName(String);

impl SchemaName {
    /// Derive the schema for a tenant: `tenant_<id with every character
    /// outside [A-Za-z0-9_] removed>`.
    ///
    /// Returns `None` when nothing of the id survives sanitization, since
    /// a bare `tenant_` would alias every such tenant.
    pub fn for_tenant(tenant_id: &TenantId) -> Option<Self> {
        let sanitized = sanitize(tenant_id.as_str());
        if sanitized.is_empty() {
            None
        } else {
            Some(Self(format!("{SCHEMA_PREFIX}{sanitized}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for SchemaName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keep only ASCII alphanumerics and underscore.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
