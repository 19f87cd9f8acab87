// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis pub/sub bus

use super::{BusError, BusMessage, BusSubscription, ConfigBus};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};

const SUBSCRIPTION_BUFFER: usize = 256;

impl From<redis::RedisError> for BusError {
    fn from(e: redis::RedisError) -> Self {
        BusError::Broker(e.to_string())
    }
}

/// Bus backed by a Redis server. The publish connection is opened lazily
/// and shared; each subscription holds its own pub/sub connection.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publisher: Arc<OnceCell<MultiplexedConnection>>,
}

impl RedisBus {
    pub fn open(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            publisher: Arc::new(OnceCell::new()),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, BusError> {
        let conn = self
            .publisher
            .get_or_try_init(|| async {
                self.client.get_multiplexed_async_connection().await
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl ConfigBus for RedisBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        let mut conn = self.connection().await?;
        let receivers: i64 = conn.publish(channel, payload).await?;
        tracing::trace!(channel, receivers, "redis publish");
        Ok(())
    }

    async fn subscribe(&self, channels: &[String]) -> Result<BusSubscription, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(channel.as_str()).await?;
        }

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "non-text pub/sub payload dropped");
                        continue;
                    }
                };
                let message = BusMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                };
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            tracing::debug!("redis subscription ended");
        });
        Ok(rx)
    }
}
