// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-guild settings cache.
//!
//! Entries are read from the tenant's datastore on first access and kept
//! until a config update for the same module and guild evicts them. The
//! next access re-reads.
//!
//! Every eviction bumps a per-key generation. A load only lands in the
//! cache if no eviction for its key happened while it ran, so a row read
//! before an update can never outlive that update.

use fleet_core::{ConfigModule, ConfigUpdateMessage, GuildId};
use fleet_engine::ConfigSubscriber;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to load {module} settings for guild {guild_id}: {reason}")]
pub struct LoadError {
    pub module: ConfigModule,
    pub guild_id: GuildId,
    pub reason: String,
}

pub trait SettingsLoader: Send + Sync + 'static {
    fn load(&self, module: ConfigModule, guild_id: &GuildId) -> Result<Value, LoadError>;
}

/// Loader for workers without a datastore; every module reads as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSettings;

impl SettingsLoader for NoSettings {
    fn load(&self, _module: ConfigModule, _guild_id: &GuildId) -> Result<Value, LoadError> {
        Ok(Value::Null)
    }
}

type Key = (ConfigModule, GuildId);

#[derive(Default)]
struct Entries {
    values: HashMap<Key, Arc<Value>>,
    generations: HashMap<Key, u64>,
}

impl Entries {
    fn generation(&self, key: &Key) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }
}

pub struct SettingsCache<L> {
    loader: Arc<L>,
    entries: Arc<RwLock<Entries>>,
}

impl<L> Clone for SettingsCache<L> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<L: SettingsLoader> SettingsCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            entries: Arc::new(RwLock::new(Entries::default())),
        }
    }

    pub fn get(&self, module: ConfigModule, guild_id: &GuildId) -> Result<Arc<Value>, LoadError> {
        let key = (module, guild_id.clone());
        let generation = {
            let entries = self.entries.read();
            if let Some(hit) = entries.values.get(&key) {
                return Ok(Arc::clone(hit));
            }
            entries.generation(&key)
        };

        // Loaded outside the lock; a racing reader may load the same row twice
        let value = Arc::new(self.loader.load(module, guild_id)?);
        let mut entries = self.entries.write();
        if entries.generation(&key) == generation {
            entries.values.insert(key, Arc::clone(&value));
        } else {
            tracing::debug!(module = %module, guild_id = %guild_id, "settings changed during load, not cached");
        }
        Ok(value)
    }

    /// Drop the cached entry an update refers to. Returns whether one existed.
    pub fn invalidate(&self, update: &ConfigUpdateMessage) -> bool {
        let key = (update.module, update.guild_id.clone());
        let evicted = {
            let mut entries = self.entries.write();
            *entries.generations.entry(key.clone()).or_insert(0) += 1;
            entries.values.remove(&key).is_some()
        };
        tracing::debug!(
            module = %update.module,
            guild_id = %update.guild_id,
            action = %update.action,
            evicted,
            "config update"
        );
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict on every module channel of `subscriber`
    pub fn subscribe(&self, subscriber: &ConfigSubscriber) {
        let cache = self.clone();
        subscriber.on_all(move |update: &ConfigUpdateMessage| -> Result<(), fleet_engine::HandlerError> {
            cache.invalidate(update);
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
