// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake config bus for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BusError, BusMessage, BusSubscription, ConfigBus, LocalBus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct FakeBusState {
    published: Vec<BusMessage>,
    subscriptions: Vec<Vec<String>>,
    fail_publish: bool,
}

/// Records publishes and delivers them in-process
#[derive(Clone, Default)]
pub struct FakeConfigBus {
    bus: LocalBus,
    inner: Arc<Mutex<FakeBusState>>,
}

impl FakeConfigBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.inner.lock().published.clone()
    }

    pub fn subscriptions(&self) -> Vec<Vec<String>> {
        self.inner.lock().subscriptions.clone()
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.inner.lock().fail_publish = fail;
    }
}

#[async_trait]
impl ConfigBus for FakeConfigBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        {
            let mut inner = self.inner.lock();
            if inner.fail_publish {
                return Err(BusError::Broker("publish refused".to_string()));
            }
            inner.published.push(BusMessage {
                channel: channel.to_string(),
                payload: payload.to_string(),
            });
        }
        self.bus.publish(channel, payload).await
    }

    async fn subscribe(&self, channels: &[String]) -> Result<BusSubscription, BusError> {
        self.inner.lock().subscriptions.push(channels.to_vec());
        self.bus.subscribe(channels).await
    }
}
