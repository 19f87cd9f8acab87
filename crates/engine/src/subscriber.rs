// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config Subscriber: routes bus messages to handlers by channel.
//!
//! Handlers report failure through their `Result`. A failing handler is
//! logged and counted; the remaining handlers for that channel still run.
//! Handlers must not panic: release builds abort on panic.

use fleet_adapters::{BusError, BusMessage, ConfigBus};
use fleet_core::{ConfigModule, ConfigUpdateMessage};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

pub trait ConfigHandler: Send + Sync + 'static {
    fn handle(&self, update: &ConfigUpdateMessage) -> Result<(), HandlerError>;
}

impl<F> ConfigHandler for F
where
    F: Fn(&ConfigUpdateMessage) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, update: &ConfigUpdateMessage) -> Result<(), HandlerError> {
        self(update)
    }
}

/// Outcome of dispatching one message
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

type HandlerTable = HashMap<String, Vec<Arc<dyn ConfigHandler>>>;

#[derive(Clone, Default)]
pub struct ConfigSubscriber {
    handlers: Arc<RwLock<HandlerTable>>,
}

impl ConfigSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, module: ConfigModule, handler: impl ConfigHandler) {
        self.on_channel(&module.channel(), handler);
    }

    /// Register the same handler on every module channel
    pub fn on_all(&self, handler: impl ConfigHandler) {
        let handler: Arc<dyn ConfigHandler> = Arc::new(handler);
        let mut table = self.handlers.write();
        for channel in ConfigModule::all_channels() {
            table.entry(channel).or_default().push(Arc::clone(&handler));
        }
    }

    pub fn on_channel(&self, channel: &str, handler: impl ConfigHandler) {
        self.handlers
            .write()
            .entry(channel.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Channels with at least one handler, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.handlers.read().keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn dispatch(&self, message: &BusMessage) -> DispatchReport {
        let update: ConfigUpdateMessage = match serde_json::from_str(&message.payload) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(channel = %message.channel, error = %e, "dropping malformed config update");
                return DispatchReport::default();
            }
        };
        let handlers: Vec<Arc<dyn ConfigHandler>> = self
            .handlers
            .read()
            .get(&message.channel)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for handler in handlers {
            match handler.handle(&update) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        channel = %message.channel,
                        guild_id = %update.guild_id,
                        error = %e,
                        "config handler failed"
                    );
                }
            }
        }
        report
    }

    /// Subscribe to every channel with a handler and dispatch until the bus
    /// subscription ends.
    pub async fn listen<B: ConfigBus>(&self, bus: &B) -> Result<JoinHandle<()>, BusError> {
        let channels = self.channels();
        let mut subscription = bus.subscribe(&channels).await?;
        tracing::info!(channels = channels.len(), "listening for config updates");
        let subscriber = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                subscriber.dispatch(&message);
            }
            tracing::debug!("config subscription closed");
        }))
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
