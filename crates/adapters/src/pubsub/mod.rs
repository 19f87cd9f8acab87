// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config-change pub/sub.
//!
//! One channel per config module (`config:<module>`). Delivery is
//! at-most-once with no replay; subscribers treat a message as a cache
//! invalidation and re-read settings on demand.

mod local;
mod redis_bus;

pub use local::LocalBus;
pub use redis_bus::RedisBus;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeConfigBus;

use async_trait::async_trait;
use fleet_core::{Clock, ConfigAction, ConfigModule, ConfigUpdateMessage, GuildId};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("pub/sub broker error: {0}")]
    Broker(String),
    #[error("failed to encode config update: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("pub/sub bus closed")]
    Closed,
}

/// A raw message received on a subscribed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

/// Messages for the channels passed to [`ConfigBus::subscribe`]. Dropping
/// the receiver ends the subscription.
pub type BusSubscription = mpsc::Receiver<BusMessage>;

#[async_trait]
pub trait ConfigBus: Clone + Send + Sync + 'static {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError>;

    async fn subscribe(&self, channels: &[String]) -> Result<BusSubscription, BusError>;
}

/// Serializes config updates onto their module channel
#[derive(Clone)]
pub struct ConfigPublisher<B, C> {
    bus: B,
    clock: C,
}

impl<B: ConfigBus, C: Clock> ConfigPublisher<B, C> {
    pub fn new(bus: B, clock: C) -> Self {
        Self { bus, clock }
    }

    pub async fn publish(
        &self,
        module: ConfigModule,
        guild_id: GuildId,
        action: ConfigAction,
    ) -> Result<ConfigUpdateMessage, BusError> {
        let message = ConfigUpdateMessage::new(module, guild_id, action, self.clock.epoch_ms());
        let payload = serde_json::to_string(&message)?;
        self.bus.publish(&message.channel(), &payload).await?;
        tracing::debug!(
            channel = %message.channel(),
            guild_id = %message.guild_id,
            action = %message.action,
            "published config update"
        );
        Ok(message)
    }
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
