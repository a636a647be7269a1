//! In-memory log implementation
//!
//! Reference semantics for the `EventLog` contract and the default test
//! double. Per-stream vectors behind a single RwLock; record positions are
//! vector indices.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Result, VeilError};

use super::{EventLog, ExpectedRevision, Record, SequencedRecord};

/// An in-memory `EventLog`
///
/// All methods take `&self`; interior mutability via `parking_lot::RwLock`
/// (many concurrent readers, exclusive writer).
#[derive(Default)]
pub struct MemoryLog {
    streams: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams that have at least one record
    pub fn stream_count(&self) -> usize {
        self.streams.read().len()
    }
}

impl EventLog for MemoryLog {
    fn stream_length(&self, stream: &str) -> Result<u64> {
        let streams = self.streams.read();
        Ok(streams.get(stream).map_or(0, |s| s.len() as u64))
    }

    fn read_from(&self, stream: &str, from: u64, max: usize) -> Result<Vec<SequencedRecord>> {
        let streams = self.streams.read();
        let records = match streams.get(stream) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };

        let start = from.min(records.len() as u64) as usize;
        Ok(records[start..]
            .iter()
            .take(max)
            .enumerate()
            .map(|(i, record)| SequencedRecord {
                position: (start + i) as u64,
                record: record.clone(),
            })
            .collect())
    }

    fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        records: Vec<Record>,
    ) -> Result<u64> {
        let mut streams = self.streams.write();
        let entries = streams.entry(stream.to_string()).or_default();

        if let ExpectedRevision::Exact(expected_len) = expected {
            let actual = entries.len() as u64;
            if actual != expected_len {
                return Err(VeilError::AppendConflict {
                    stream: stream.to_string(),
                    expected: expected_len,
                    actual,
                });
            }
        }

        entries.extend(records);
        Ok(entries.len() as u64)
    }
}
