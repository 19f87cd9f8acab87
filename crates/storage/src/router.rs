// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant Store Router: one datastore namespace per tenant.
//!
//! The namespace is `tenant_` followed by the tenant id with every character
//! outside `[A-Za-z0-9_]` removed. Handles are cached per tenant id, so two
//! lookups for the same id yield the same `Arc`.
//!
//! A schema belongs to the first tenant routed to it for the life of the
//! router. Disconnecting closes the handle but keeps the claim, so `a-b`
//! stopping never lets `ab` into its partition.

use fleet_core::{SchemaName, TenantId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Query parameter carrying the namespace on the connection URL
const SCHEMA_PARAM: &str = "schema";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("tenant id {0:?} has no characters usable in a schema name")]
    EmptyNamespace(String),
    #[error("schema {schema} is already routed to tenant {owner}, refusing {tenant_id}")]
    SchemaCollision {
        schema: String,
        owner: String,
        tenant_id: String,
    },
    #[error("invalid base store url: {0}")]
    InvalidUrl(String),
}

/// Datastore connection bound to one tenant namespace
#[derive(Debug)]
pub struct StoreHandle {
    tenant_id: TenantId,
    schema: SchemaName,
    url: Url,
    closed: AtomicBool,
}

impl StoreHandle {
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn schema(&self) -> &SchemaName {
        &self.schema
    }

    pub fn connection_url(&self) -> &str {
        self.url.as_str()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[derive(Default)]
struct RouterInner {
    handles: HashMap<TenantId, Arc<StoreHandle>>,
    owners: HashMap<SchemaName, TenantId>,
}

/// Caches a [`StoreHandle`] per tenant. Cheap to clone.
#[derive(Clone)]
pub struct StoreRouter {
    base: Arc<Url>,
    inner: Arc<Mutex<RouterInner>>,
}

impl StoreRouter {
    pub fn new(base_url: &str) -> Result<Self, RouterError> {
        let base = Url::parse(base_url).map_err(|e| RouterError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base: Arc::new(base),
            inner: Arc::new(Mutex::new(RouterInner::default())),
        })
    }

    /// Get or create the handle for a tenant.
    pub fn route_for(&self, tenant_id: &TenantId) -> Result<Arc<StoreHandle>, RouterError> {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.handles.get(tenant_id) {
            return Ok(Arc::clone(handle));
        }

        let schema = SchemaName::for_tenant(tenant_id)
            .ok_or_else(|| RouterError::EmptyNamespace(tenant_id.to_string()))?;
        if let Some(owner) = inner.owners.get(&schema) {
            return Err(RouterError::SchemaCollision {
                schema: schema.to_string(),
                owner: owner.to_string(),
                tenant_id: tenant_id.to_string(),
            });
        }

        let url = with_schema(&self.base, &schema);
        let handle = Arc::new(StoreHandle {
            tenant_id: tenant_id.clone(),
            schema: schema.clone(),
            url,
            closed: AtomicBool::new(false),
        });
        debug!(tenant_id = %tenant_id, schema = %schema, "routed tenant store");
        inner.owners.insert(schema, tenant_id.clone());
        inner.handles.insert(tenant_id.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Evict and close one tenant's handle. Returns whether one was cached.
    /// The tenant keeps its schema.
    pub fn disconnect(&self, tenant_id: &TenantId) -> bool {
        match self.inner.lock().handles.remove(tenant_id) {
            Some(handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    pub fn disconnect_all(&self) {
        let mut inner = self.inner.lock();
        let count = inner.handles.len();
        for (_, handle) in inner.handles.drain() {
            handle.close();
        }
        info!(count, "closed all tenant store handles");
    }

    pub fn cached(&self) -> usize {
        self.inner.lock().handles.len()
    }

    /// Tenant that claimed `schema`, connected or not
    pub fn owner_of(&self, schema: &SchemaName) -> Option<TenantId> {
        self.inner.lock().owners.get(schema).cloned()
    }
}

/// Base URL with the namespace query parameter replaced
fn with_schema(base: &Url, schema: &SchemaName) -> Url {
    let mut url = base.clone();
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != SCHEMA_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(SCHEMA_PARAM, schema.as_str());
    }
    url
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
