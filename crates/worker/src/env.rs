// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment handed down by the manager

use fleet_core::worker::env;
use fleet_core::TenantId;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Clone)]
pub struct WorkerEnv {
    pub tenant_id: TenantId,
    pub token: String,
    pub client_id: Option<String>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
}

impl fmt::Debug for WorkerEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerEnv")
            .field("tenant_id", &self.tenant_id)
            .field("token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("redis_url", &self.redis_url)
            .finish()
    }
}

impl WorkerEnv {
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EnvError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Self {
            tenant_id: TenantId::new(get(env::TENANT_ID).ok_or(EnvError::Missing(env::TENANT_ID))?),
            token: get(env::TOKEN).ok_or(EnvError::Missing(env::TOKEN))?,
            client_id: get(env::CLIENT_ID),
            database_url: get(env::DATABASE_URL),
            redis_url: get(env::REDIS_URL),
        })
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
