// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-changed notifications fanned out from the dashboard to
//! running workers.
//!
//! Messages are live cache-invalidation signals: fire-and-forget, no
//! persistence, no replay. A worker that misses one re-reads its settings
//! from the datastore on next access.

use crate::id::GuildId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix shared by every config channel
pub const CHANNEL_PREFIX: &str = "config:";

/// Settings module a config change belongs to. One pub/sub channel each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigModule {
    General,
    Welcome,
    Goodbye,
    Moderation,
    Leveling,
    Giveaway,
    Tickets,
    Tempvoice,
    Autoresponder,
    Security,
    Logging,
}

impl ConfigModule {
    pub const ALL: [ConfigModule; 11] = [
        ConfigModule::General,
        ConfigModule::Welcome,
        ConfigModule::Goodbye,
        ConfigModule::Moderation,
        ConfigModule::Leveling,
        ConfigModule::Giveaway,
        ConfigModule::Tickets,
        ConfigModule::Tempvoice,
        ConfigModule::Autoresponder,
        ConfigModule::Security,
        ConfigModule::Logging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigModule::General => "general",
            ConfigModule::Welcome => "welcome",
            ConfigModule::Goodbye => "goodbye",
            ConfigModule::Moderation => "moderation",
            ConfigModule::Leveling => "leveling",
            ConfigModule::Giveaway => "giveaway",
            ConfigModule::Tickets => "tickets",
            ConfigModule::Tempvoice => "tempvoice",
            ConfigModule::Autoresponder => "autoresponder",
            ConfigModule::Security => "security",
            ConfigModule::Logging => "logging",
        }
    }

    /// Pub/sub channel name, e.g. `config:welcome`
    pub fn channel(&self) -> String {
        format!("{}{}", CHANNEL_PREFIX, self.as_str())
    }

    /// Inverse of [`ConfigModule::channel`]
    pub fn from_channel(channel: &str) -> Option<Self> {
        channel
            .strip_prefix(CHANNEL_PREFIX)
            .and_then(|m| m.parse().ok())
    }

    /// Every module's channel name
    pub fn all_channels() -> Vec<String> {
        Self::ALL.iter().map(ConfigModule::channel).collect()
    }
}

impl fmt::Display for ConfigModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown config {kind}: {value}")]
pub struct ParseConfigError {
    kind: &'static str,
    value: String,
}

impl FromStr for ConfigModule {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseConfigError {
                kind: "module",
                value: s.to_string(),
            })
    }
}

/// What happened to the settings row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigAction {
    Create,
    Update,
    Delete,
}

impl ConfigAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigAction::Create => "create",
            ConfigAction::Update => "update",
            ConfigAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ConfigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigAction {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ConfigAction::Create),
            "update" => Ok(ConfigAction::Update),
            "delete" => Ok(ConfigAction::Delete),
            other => Err(ParseConfigError {
                kind: "action",
                value: other.to_string(),
            }),
        }
    }
}

/// Payload published on a `config:<module>` channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateMessage {
    pub guild_id: GuildId,
    pub module: ConfigModule,
    pub action: ConfigAction,
    /// Epoch milliseconds at publish time
    pub timestamp: i64,
}

impl ConfigUpdateMessage {
    pub fn new(module: ConfigModule, guild_id: GuildId, action: ConfigAction, timestamp: i64) -> Self {
        Self {
            guild_id,
            module,
            action,
            timestamp,
        }
    }

    pub fn channel(&self) -> String {
        self.module.channel()
    }
}

#[cfg(test)]
#[path = "config_update_tests.rs"]
mod tests;
