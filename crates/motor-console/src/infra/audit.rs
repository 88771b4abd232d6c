//! Journal of operator commands.
//!
//! Records what the console sent (or refused to send) and the link state
//! at startup, one JSON object per line. Telemetry is never written here.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Types of events that are logged in the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    SystemStart,
    SystemShutdown,
    /// Link acquired at startup
    LinkOpened,
    /// Link could not be acquired; sending and ingestion are disabled
    LinkUnavailable,
    /// Command written to the link
    CommandSent,
    /// Operator input failed validation; nothing was sent
    CommandRejected,
    /// Command was valid but the link refused or failed the write
    CommandFailed,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Microseconds since the journal was opened
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: AuditEventType,
    pub details: serde_json::Value,
}

/// Stamps journal entries: elapsed time since the journal opened, plus wall
/// clock so separate runs can be lined up.
#[derive(Debug, Clone, Copy)]
struct JournalClock {
    opened: Instant,
}

impl JournalClock {
    fn start() -> Self {
        Self {
            opened: Instant::now(),
        }
    }

    fn elapsed_us(&self) -> u64 {
        self.opened.elapsed().as_micros() as u64
    }

    fn unix_us() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }
}

/// Thread-safe audit logger that writes to a JSONL file
pub struct AuditLogger {
    writer: Mutex<BufWriter<File>>,
    clock: JournalClock,
}

impl AuditLogger {
    /// Opens `path` in append mode, creating parent directories.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
            clock: JournalClock::start(),
        })
    }

    pub fn log(&self, entry: AuditEntry) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Stamps and appends one event.
    pub fn log_event(
        &self,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(AuditEntry {
            timestamp_us: self.clock.elapsed_us(),
            unix_us: JournalClock::unix_us(),
            event_type,
            details,
        })
    }

    /// Like [`log_event`](Self::log_event), but a failed write is only
    /// reported as a warning. Journal trouble never stops the console.
    pub fn record(&self, event_type: AuditEventType, details: serde_json::Value) {
        if let Err(e) = self.log_event(event_type.clone(), details) {
            warn!(event = ?event_type, error = %e, "Failed to write audit entry");
        }
    }
}
