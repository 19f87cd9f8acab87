// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bus used when no broker URL is configured

use super::{BusError, BusMessage, BusSubscription, ConfigBus};
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

const BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<BusMessage>,
}

impl Default for LocalBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigBus for LocalBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        // No subscribers is not an error: delivery is best-effort
        let _ = self.tx.send(BusMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn subscribe(&self, channels: &[String]) -> Result<BusSubscription, BusError> {
        let mut rx = self.tx.subscribe();
        let channels = channels.to_vec();
        let (out_tx, out_rx) = mpsc::channel(BUS_CAPACITY);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(msg) => {
                        if !channels.contains(&msg.channel) {
                            continue;
                        }
                        if out_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "local bus subscriber lagged, updates dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(out_rx)
    }
}
