// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker IPC loop.
//!
//! ```text
//! login --ok--> ready --> { health_request -> health }* --> shutdown -> exit 0
//!   |                         |
//!   +--err--> error, exit     +--fatal--> error, exit
//! ```
//!
//! End of stdin means the manager went away; the worker logs out and exits.

use crate::env::WorkerEnv;
use crate::memory::resident_bytes;
use crate::session::{BotSession, FatalReporter, SessionError};
use fleet_adapters::ipc::{self, Inbound, ManagerMessage, ProtocolError, WorkerMessage};
use fleet_core::Clock;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("login failed: {0}")]
    Login(SessionError),
    #[error("session failed: {0}")]
    Fatal(SessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The manager asked for a graceful shutdown
    Shutdown,
    /// stdin closed
    ManagerGone,
}

pub struct WorkerRuntime<S, C> {
    env: WorkerEnv,
    session: S,
    clock: C,
    started_at: Instant,
    memory: fn() -> u64,
}

impl<S: BotSession, C: Clock> WorkerRuntime<S, C> {
    pub fn new(env: WorkerEnv, session: S, clock: C) -> Self {
        Self {
            env,
            session,
            started_at: clock.now(),
            clock,
            memory: resident_bytes,
        }
    }

    /// Replace the memory probe used in health replies
    pub fn with_memory_probe(mut self, probe: fn() -> u64) -> Self {
        self.memory = probe;
        self
    }

    fn uptime_ms(&self) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(self.started_at)
            .as_millis() as u64
    }

    pub async fn run<R, W>(mut self, reader: &mut R, writer: &mut W) -> Result<ExitReason, WorkerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let tenant_id = self.env.tenant_id.clone();
        let (reporter, mut fatal) = FatalReporter::channel();

        let guilds = match self.session.login(&self.env, reporter).await {
            Ok(guilds) => guilds,
            Err(e) => {
                tracing::error!(tenant_id = %tenant_id, error = %e, "login failed");
                send_error(writer, &e).await?;
                return Err(WorkerError::Login(e));
            }
        };
        ipc::write_message(writer, &WorkerMessage::Ready { guilds }).await?;
        tracing::info!(tenant_id = %tenant_id, guilds, "worker ready");

        loop {
            tokio::select! {
                inbound = ipc::read_message::<_, ManagerMessage>(reader) => match inbound {
                    Ok(Some(Inbound::Message(ManagerMessage::HealthRequest))) => {
                        let health = WorkerMessage::Health {
                            guilds: self.session.guild_count(),
                            uptime: self.uptime_ms(),
                            memory: (self.memory)(),
                        };
                        ipc::write_message(writer, &health).await?;
                    }
                    Ok(Some(Inbound::Message(ManagerMessage::Shutdown))) => {
                        tracing::info!(tenant_id = %tenant_id, "shutdown requested");
                        self.session.logout().await;
                        return Ok(ExitReason::Shutdown);
                    }
                    Ok(Some(Inbound::Unknown(kind))) => {
                        tracing::debug!(tenant_id = %tenant_id, kind = %kind, "ignoring unknown frame");
                    }
                    Ok(None) => {
                        tracing::warn!(tenant_id = %tenant_id, "manager closed stdin");
                        self.session.logout().await;
                        return Ok(ExitReason::ManagerGone);
                    }
                    Err(ProtocolError::Decode(e)) => {
                        tracing::warn!(tenant_id = %tenant_id, error = %e, "dropping malformed frame");
                    }
                    Err(e) => return Err(e.into()),
                },
                Some(e) = fatal.recv() => {
                    tracing::error!(tenant_id = %tenant_id, error = %e, "session failed");
                    send_error(writer, &e).await?;
                    self.session.logout().await;
                    return Err(WorkerError::Fatal(e));
                }
            }
        }
    }
}

async fn send_error<W: AsyncWrite + Unpin>(writer: &mut W, e: &SessionError) -> Result<(), ProtocolError> {
    let frame = WorkerMessage::Error {
        message: e.to_string(),
        stack: None,
    };
    ipc::write_message(writer, &frame).await
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
