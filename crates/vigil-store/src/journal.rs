//! Durable store journal
//!
//! Append-only JSON-lines record of every store event, with buffered writes
//! and explicit flush. On startup the journal is replayed to rebuild the
//! in-process stores, which keeps escalation history across restarts without
//! an external database.

use crate::escalation::{Escalation, EscalationNote, EscalationStatus};
use crate::memory::{MemoryConversationLog, MemoryEscalationStore, MemoryScreeningStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};
use vigil_core::{ConversationTurn, EscalationId, Result};
use vigil_screening::ScreeningResult;

/// One durable store event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEvent {
    /// A screening was scored and recorded
    ScreeningRecorded { result: ScreeningResult },

    /// A conversation turn was appended
    TurnAppended { turn: ConversationTurn },

    /// An escalation was created
    EscalationCreated { escalation: Escalation },

    /// A note was appended to an escalation
    NoteAdded {
        id: EscalationId,
        note: EscalationNote,
    },

    /// An escalation changed lifecycle state
    StatusChanged {
        id: EscalationId,
        status: EscalationStatus,
        resolved_at: Option<DateTime<Utc>>,
    },
}

/// Append-only journal writer with buffered IO
pub struct Journal {
    inner: Mutex<JournalWriter>,
}

struct JournalWriter {
    file: BufWriter<File>,
    events_since_flush: usize,
    flush_interval: usize,
}

impl Journal {
    /// Open (or create) the journal at `path`
    pub fn open(path: impl AsRef<Path>, flush_interval: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "journal opened");

        Ok(Self {
            inner: Mutex::new(JournalWriter {
                file: BufWriter::new(file),
                events_since_flush: 0,
                flush_interval: flush_interval.max(1),
            }),
        })
    }

    /// Append one event as a JSON line
    pub fn record(&self, event: &JournalEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;

        let mut writer = self.inner.lock();
        writer.file.write_all(line.as_bytes())?;
        writer.file.write_all(b"\n")?;
        writer.events_since_flush += 1;

        if writer.events_since_flush >= writer.flush_interval {
            writer.file.flush()?;
            writer.events_since_flush = 0;
        }

        Ok(())
    }

    /// Force buffered events to disk
    pub fn flush(&self) -> Result<()> {
        let mut writer = self.inner.lock();
        writer.file.flush()?;
        writer.events_since_flush = 0;
        Ok(())
    }

    /// Read every event from a journal file. Malformed lines are skipped —
    /// a torn tail write must not block startup.
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<JournalEvent>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    debug!(error = %e, "skipping malformed journal line");
                    continue;
                }
            }
        }

        info!(path = %path.display(), events = events.len(), "journal replayed");
        Ok(events)
    }
}

/// Rebuild the in-process stores from replayed events
pub fn restore(
    events: Vec<JournalEvent>,
) -> (
    MemoryEscalationStore,
    MemoryScreeningStore,
    MemoryConversationLog,
) {
    let escalations = MemoryEscalationStore::new();
    let screenings = MemoryScreeningStore::new();
    let log = MemoryConversationLog::new();

    for event in events {
        match event {
            JournalEvent::ScreeningRecorded { result } => {
                screenings.push(result);
            }
            JournalEvent::TurnAppended { turn } => {
                log.push(turn);
            }
            JournalEvent::EscalationCreated { escalation } => {
                escalations.load(escalation);
            }
            JournalEvent::NoteAdded { id, note } => {
                escalations.load_mutation(id, |record| {
                    if record.assigned_to.is_none() {
                        if let crate::escalation::NoteAuthor::Responder(ref r) = note.author {
                            record.assigned_to = Some(r.clone());
                        }
                    }
                    record.notes.push(note.clone());
                    record.version += 1;
                });
            }
            JournalEvent::StatusChanged {
                id,
                status,
                resolved_at,
            } => {
                escalations.load_mutation(id, |record| {
                    record.status = status;
                    if resolved_at.is_some() {
                        record.resolved_at = resolved_at;
                    }
                    record.version += 1;
                });
            }
        }
    }

    (escalations, screenings, log)
}
