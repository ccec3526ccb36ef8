//! # Activation Journal
//!
//! Appends one JSON object per slot activation:
//!
//! ```text
//! {"timestamp":"2025-01-01T12:00:00.000Z","mode":"L2R2","slot":4}
//! ```
//!
//! The journal is a [`SlotActivationSink`], so it is fed from the deferred
//! flush and never from inside input handling.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::controller::combo::ComboMode;
use crate::controller::dispatch::{SlotActivation, SlotActivationSink};
use crate::controller::slot::SlotIndex;
use crate::error::Result;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalRecord {
    /// Wall-clock time of the press (RFC 3339, UTC).
    pub timestamp: String,
    pub mode: ComboMode,
    pub slot: SlotIndex,
}

impl JournalRecord {
    /// Builds a record, converting the monotonic press time to wall-clock.
    #[must_use]
    pub fn from_activation(activation: &SlotActivation, now: Instant, wall_now: DateTime<Utc>) -> Self {
        let age = now.checked_duration_since(activation.requested_at).unwrap_or_default();
        let requested_at = chrono::Duration::from_std(age)
            .ok()
            .and_then(|age| wall_now.checked_sub_signed(age))
            .unwrap_or(wall_now);

        Self {
            timestamp: requested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            mode: activation.mode,
            slot: activation.slot,
        }
    }
}

/// JSONL sink for slot activations.
#[derive(Debug)]
pub struct ActivationJournal<W: Write> {
    writer: W,
    written: u64,
}

impl ActivationJournal<BufWriter<File>> {
    /// Opens (or creates) a journal file in append mode.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("Journaling slot activations to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ActivationJournal<W> {
    /// Wraps any writer.
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Writes one activation and flushes it.
    ///
    /// # Errors
    ///
    /// Returns `Journal` on serialization failure and `Io` on write failure.
    pub fn record(&mut self, activation: &SlotActivation) -> Result<()> {
        let record = JournalRecord::from_activation(activation, Instant::now(), Utc::now());
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SlotActivationSink for ActivationJournal<W> {
    fn on_slot_activate(&mut self, activation: SlotActivation) {
        if let Err(e) = self.record(&activation) {
            warn!("Failed to journal slot {} activation: {}", activation.slot, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    fn activation(mode: ComboMode, slot: u8) -> SlotActivation {
        SlotActivation {
            mode,
            slot: SlotIndex::new(slot).unwrap(),
            requested_at: Instant::now(),
        }
    }

    /// Writer that always fails.
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // ==================== Record Tests ====================

    #[test]
    fn test_record_backdates_timestamp() {
        let now = Instant::now();
        let wall_now = DateTime::parse_from_rfc3339("2025-03-01T10:00:01.500Z")
            .unwrap()
            .with_timezone(&Utc);
        let activation = SlotActivation {
            mode: ComboMode::R2x2,
            slot: SlotIndex::new(8).unwrap(),
            requested_at: now,
        };

        let record = JournalRecord::from_activation(&activation, now + Duration::from_millis(250), wall_now);
        assert_eq!(record.timestamp, "2025-03-01T10:00:01.250Z");
        assert_eq!(record.mode, ComboMode::R2x2);
        assert_eq!(record.slot.get(), 8);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = JournalRecord {
            timestamp: "2025-03-01T10:00:00.000Z".to_string(),
            mode: ComboMode::L2R2,
            slot: SlotIndex::new(4).unwrap(),
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"timestamp":"2025-03-01T10:00:00.000Z","mode":"L2R2","slot":4}"#
        );
    }

    // ==================== Journal Tests ====================

    #[test]
    fn test_journal_writes_lines() {
        let mut journal = ActivationJournal::new(Vec::new());
        journal.on_slot_activate(activation(ComboMode::L2, 3));
        journal.on_slot_activate(activation(ComboMode::R2L2, 6));
        assert_eq!(journal.written(), 2);

        let output = String::from_utf8(journal.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["mode"], "L2");
        assert_eq!(lines[0]["slot"], 3);
        assert_eq!(lines[1]["mode"], "R2L2");
        assert!(DateTime::parse_from_rfc3339(lines[1]["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_write_failure_is_contained() {
        let mut journal = ActivationJournal::new(BrokenWriter);
        assert!(journal.record(&activation(ComboMode::L2, 1)).is_err());

        journal.on_slot_activate(activation(ComboMode::L2, 1));
        assert_eq!(journal.written(), 0);
    }

    #[test]
    fn test_create_appends_to_file() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activations.jsonl");

        let mut journal = ActivationJournal::create(&path).unwrap();
        journal.on_slot_activate(activation(ComboMode::R2, 2));
        drop(journal);

        let mut journal = ActivationJournal::create(&path).unwrap();
        journal.on_slot_activate(activation(ComboMode::L2x2, 7));
        drop(journal);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains(r#""mode":"L2x2""#));
    }

    #[test]
    fn test_create_in_missing_directory() {
        let result = ActivationJournal::create("/nonexistent/dir/activations.jsonl");
        assert!(result.is_err());
    }
}
