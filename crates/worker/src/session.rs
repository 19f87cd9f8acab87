// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream bot session seam

use crate::env::WorkerEnv;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SessionError(pub String);

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lets a running session report a condition the worker cannot recover
/// from. The runtime forwards it to the manager as an `error` frame and
/// exits.
#[derive(Debug, Clone)]
pub struct FatalReporter {
    tx: mpsc::UnboundedSender<SessionError>,
}

impl FatalReporter {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SessionError>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, error: SessionError) {
        if self.tx.send(error).is_err() {
            tracing::debug!("fatal error reported after the runtime exited");
        }
    }
}

/// One tenant's connection to the upstream chat platform.
#[async_trait]
pub trait BotSession: Send + 'static {
    /// Log in and return the number of guilds the bot is in.
    async fn login(&mut self, env: &WorkerEnv, fatal: FatalReporter) -> Result<u32, SessionError>;

    /// Current guild count, reported in health replies
    fn guild_count(&self) -> u32;

    async fn logout(&mut self) {}
}

/// Session that stays logged in to nothing. Used until a platform client
/// is wired in; it keeps the IPC contract so the supervisor sees a healthy
/// worker.
#[derive(Debug, Default)]
pub struct IdleSession {
    guilds: u32,
}

#[async_trait]
impl BotSession for IdleSession {
    async fn login(&mut self, env: &WorkerEnv, _fatal: FatalReporter) -> Result<u32, SessionError> {
        tracing::info!(
            tenant_id = %env.tenant_id,
            client_id = env.client_id.as_deref().unwrap_or("-"),
            "idle session ready"
        );
        Ok(self.guilds)
    }

    fn guild_count(&self) -> u32 {
        self.guilds
    }
}
