//! Event sinks - where committed operation records are published

use crate::error::EventError;
use crate::event::EventRecord;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Trait for event sinks
///
/// Sinks receive records strictly after the ledger commit they describe.
/// A failing sink is reported by the publisher and never rolls anything back.
pub trait EventSink: Send + Sync {
    /// Get the sink name (for logging)
    fn name(&self) -> &str;

    /// Handle one committed record
    fn handle(&self, record: &EventRecord) -> Result<(), EventError>;
}

/// Shared in-memory event log
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the processor.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record received so far
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn name(&self) -> &str {
        "event-log"
    }

    fn handle(&self, record: &EventRecord) -> Result<(), EventError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Append-only JSON-lines sink over any writer
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Open (or create) a JSONL file in append mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn handle(&self, record: &EventRecord) -> Result<(), EventError> {
        let json = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| EventError::Poisoned(e.to_string()))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LendingEvent;
    use bilend_core::{AssetId, UserId};
    use rust_decimal_macros::dec;

    fn record(sequence: u64) -> EventRecord {
        EventRecord::new(
            sequence,
            1_000 + sequence,
            LendingEvent::Repay {
                user: UserId::new("alice"),
                on_behalf_of: UserId::new("alice"),
                asset: AssetId::new("DAI"),
                amount: dec!(12.5),
            },
        )
    }

    #[test]
    fn test_event_log_shared_between_clones() {
        let log = EventLog::new();
        let handle = log.clone();

        log.handle(&record(1)).unwrap();
        log.handle(&record(2)).unwrap();

        assert_eq!(handle.len(), 2);
        assert_eq!(handle.last().unwrap().sequence, 2);
        assert_eq!(handle.records()[0], record(1));
    }

    #[test]
    fn test_jsonl_sink_writes_one_line_per_record() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.handle(&record(1)).unwrap();
        sink.handle(&record(2)).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: EventRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, record(2));
    }

    #[test]
    fn test_jsonl_sink_open_appends() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        JsonLinesSink::open(&path).unwrap().handle(&record(1)).unwrap();
        JsonLinesSink::open(&path).unwrap().handle(&record(2)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<EventRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records, vec![record(1), record(2)]);
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_jsonl_sink_reports_io_error() {
        let sink = JsonLinesSink::new(BrokenWriter);
        let result = sink.handle(&record(1));
        assert!(matches!(result, Err(EventError::Io(_))));
    }
}
