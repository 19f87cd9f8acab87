// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager/worker IPC: newline-delimited JSON frames `{type, data?}`.
//!
//! Each worker has one ordered stream in each direction. The worker's
//! stdout carries [`WorkerMessage`]s, its stdin carries [`ManagerMessage`]s.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest accepted frame, newline excluded
pub const MAX_LINE_BYTES: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("ipc io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode frame: {0}")]
    Encode(serde_json::Error),
    #[error("malformed frame: {0}")]
    Decode(String),
    #[error("frame exceeds {MAX_LINE_BYTES} bytes")]
    LineTooLong,
}

/// Worker → manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Upstream login succeeded
    Ready { guilds: u32 },
    /// Reply to [`ManagerMessage::HealthRequest`]; `uptime` in ms, `memory` in bytes
    Health { guilds: u32, uptime: u64, memory: u64 },
    /// Fatal condition; the manager treats the worker as crashed
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

/// Manager → worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ManagerMessage {
    HealthRequest,
    Shutdown,
}

/// Frame types a message enum understands
pub trait WireMessage: Serialize + DeserializeOwned {
    const KINDS: &'static [&'static str];
}

impl WireMessage for WorkerMessage {
    const KINDS: &'static [&'static str] = &["ready", "health", "error"];
}

impl WireMessage for ManagerMessage {
    const KINDS: &'static [&'static str] = &["health_request", "shutdown"];
}

/// A decoded frame: a known message, or a well-formed frame of a type this
/// side does not handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<M> {
    Message(M),
    Unknown(String),
}

#[derive(Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
}

pub fn encode_line<M: Serialize>(msg: &M) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(msg).map_err(ProtocolError::Encode)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line<M: WireMessage>(line: &str) -> Result<Inbound<M>, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    match serde_json::from_str::<M>(line) {
        Ok(msg) => Ok(Inbound::Message(msg)),
        Err(err) => {
            let frame: Frame =
                serde_json::from_str(line).map_err(|_| ProtocolError::Decode(err.to_string()))?;
            if M::KINDS.contains(&frame.kind.as_str()) {
                Err(ProtocolError::Decode(err.to_string()))
            } else {
                Ok(Inbound::Unknown(frame.kind))
            }
        }
    }
}

pub async fn write_message<W, M>(writer: &mut W, msg: &M) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    M: Serialize,
{
    let line = encode_line(msg)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next frame. Blank lines are skipped; `Ok(None)` at end of stream.
pub async fn read_message<R, M>(reader: &mut R) -> Result<Option<Inbound<M>>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
    M: WireMessage,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = (&mut *reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_line(&mut line)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if n > MAX_LINE_BYTES && !line.ends_with('\n') {
            return Err(ProtocolError::LineTooLong);
        }
        if line.trim().is_empty() {
            continue;
        }
        return decode_line(&line).map(Some);
    }
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
