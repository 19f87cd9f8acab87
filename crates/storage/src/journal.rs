// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event journal with a background writer.
//!
//! Each line is `{"seq":N,"event":{...}}`. The writer thread owns the
//! journal and the snapshot file: it batches whatever events are queued,
//! appends them with one fsync, and every [`COMPACT_EVERY`] events folds
//! the journal into a fresh snapshot and truncates it. Callers of
//! [`JournalWriter::append`] never touch the disk.
//!
//! Recovery is snapshot + replay of journal entries with a higher seq.

use crate::{MaterializedState, Snapshot, SnapshotError};
use fleet_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Journal entries between snapshot compactions
pub const COMPACT_EVERY: usize = 256;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Serialize)]
struct RecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct Record {
    seq: u64,
    event: Event,
}

/// Journal file that sits next to a snapshot
pub fn journal_path(snapshot_path: &Path) -> PathBuf {
    snapshot_path.with_extension("wal")
}

/// Snapshot plus replayed journal, as found on disk
pub struct Recovered {
    pub state: MaterializedState,
    pub seq: u64,
    pub replayed: usize,
}

/// Load the snapshot and replay newer journal entries on top of it.
///
/// A journal line that does not parse ends replay; the journal is copied
/// aside to `.wal.bak` before the writer compacts it away.
pub fn recover(snapshot_path: &Path) -> Result<Recovered, JournalError> {
    let (mut state, snapshot_seq) = match Snapshot::load(snapshot_path)? {
        Some(snapshot) => (snapshot.state, snapshot.seq),
        None => (MaterializedState::default(), 0),
    };

    let path = journal_path(snapshot_path);
    let mut seq = snapshot_seq;
    let mut replayed = 0;
    if path.exists() {
        let reader = BufReader::new(File::open(&path)?);
        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    preserve_corrupt(&path, index, &e.to_string())?;
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    preserve_corrupt(&path, index, &e.to_string())?;
                    break;
                }
            };
            if record.seq <= snapshot_seq {
                continue;
            }
            state.apply_event(&record.event);
            seq = seq.max(record.seq);
            replayed += 1;
        }
    }

    Ok(Recovered {
        state,
        seq,
        replayed,
    })
}

fn preserve_corrupt(path: &Path, line: usize, error: &str) -> Result<(), JournalError> {
    let bak = path.with_extension("wal.bak");
    warn!(
        path = %path.display(),
        bak = %bak.display(),
        line = line + 1,
        error,
        "corrupt journal entry, keeping entries before it"
    );
    std::fs::copy(path, &bak)?;
    Ok(())
}

enum Command {
    Append(Event),
    /// Write everything queued, compact, then acknowledge
    Checkpoint(mpsc::SyncSender<()>),
}

/// Handle to the writer thread. Dropping it drains the queue, writes a
/// final snapshot and joins the thread.
pub struct JournalWriter {
    commands: Option<mpsc::Sender<Command>>,
    thread: Option<JoinHandle<()>>,
}

impl JournalWriter {
    /// Start the writer from recovered state. The snapshot is rewritten
    /// first so the journal starts empty.
    pub fn spawn(snapshot_path: &Path, recovered: Recovered) -> Result<Self, JournalError> {
        let mut writer = Writer {
            snapshot_path: snapshot_path.to_path_buf(),
            journal: open_journal(&journal_path(snapshot_path))?,
            state: recovered.state,
            seq: recovered.seq,
            pending: Vec::new(),
            uncompacted: 0,
        };
        writer.compact()?;

        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("fleet-journal".to_string())
            .spawn(move || writer.run(rx))?;
        Ok(Self {
            commands: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue an event for the journal. Never blocks on I/O.
    pub fn append(&self, event: Event) {
        let Some(commands) = &self.commands else {
            return;
        };
        if commands.send(Command::Append(event)).is_err() {
            warn!("journal writer has stopped, event kept in memory only");
        }
    }

    /// Block until every queued event is on disk and folded into the
    /// snapshot.
    pub fn checkpoint(&self) -> bool {
        let Some(commands) = &self.commands else {
            return false;
        };
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if commands.send(Command::Checkpoint(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv().is_ok()
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("journal writer thread panicked");
            }
        }
    }
}

fn open_journal(path: &Path) -> Result<File, JournalError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

struct Writer {
    snapshot_path: PathBuf,
    journal: File,
    /// Mirror of the store's state, owned by this thread
    state: MaterializedState,
    seq: u64,
    /// Encoded lines not yet written
    pending: Vec<u8>,
    /// Journal entries written since the last snapshot
    uncompacted: usize,
}

impl Writer {
    fn run(mut self, commands: mpsc::Receiver<Command>) {
        while let Ok(first) = commands.recv() {
            let mut acks = Vec::new();
            for command in std::iter::once(first).chain(commands.try_iter()) {
                match command {
                    Command::Append(event) => self.stage(&event),
                    Command::Checkpoint(ack) => acks.push(ack),
                }
            }

            let written = self.pending.len();
            if let Err(e) = self.commit() {
                warn!(error = %e, "failed to append to journal, compacting instead");
                self.uncompacted = COMPACT_EVERY;
            }
            if !acks.is_empty() || self.uncompacted >= COMPACT_EVERY {
                if let Err(e) = self.compact() {
                    warn!(error = %e, "failed to compact journal");
                }
            }
            debug!(bytes = written, seq = self.seq, "journal batch committed");
            for ack in acks {
                let _ = ack.send(());
            }
        }

        if let Err(e) = self.commit().and_then(|()| self.compact()) {
            warn!(error = %e, "failed to write final snapshot");
        }
    }

    fn stage(&mut self, event: &Event) {
        self.seq += 1;
        self.state.apply_event(event);
        let record = RecordRef {
            seq: self.seq,
            event,
        };
        match serde_json::to_writer(&mut self.pending, &record) {
            Ok(()) => {
                self.pending.push(b'\n');
                self.uncompacted += 1;
            }
            // The state mirror has it; the next snapshot carries it
            Err(e) => {
                warn!(error = %e, seq = self.seq, event = event.name(), "failed to encode journal entry");
                self.uncompacted = COMPACT_EVERY;
            }
        }
    }

    fn commit(&mut self) -> Result<(), JournalError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let result = self
            .journal
            .write_all(&self.pending)
            .and_then(|()| self.journal.sync_data());
        self.pending.clear();
        Ok(result?)
    }

    fn compact(&mut self) -> Result<(), JournalError> {
        Snapshot::new(self.seq, self.state.clone()).save(&self.snapshot_path)?;
        self.journal.set_len(0)?;
        self.uncompacted = 0;
        Ok(())
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
