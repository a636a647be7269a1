//! The ordered log service contract
//!
//! Streams are append-only: once a record lands at position `p`, both the
//! record and its position are immutable. The current length doubles as the
//! next write position, which is what makes optimistic append possible.

use crate::error::Result;

use super::{Record, SequencedRecord};

/// Precondition for an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Append regardless of current stream length
    Any,

    /// Append only if the stream length equals this value; otherwise the
    /// append fails with `AppendConflict`
    Exact(u64),
}

/// An ordered, append-only log of records per named stream
pub trait EventLog: Send + Sync {
    /// Current length of a stream (the next write position).
    /// A stream that was never appended to has length 0.
    fn stream_length(&self, stream: &str) -> Result<u64>;

    /// Read up to `max` records starting at `from`, in position order.
    /// Returns fewer than `max` records (possibly none) at the end of the
    /// stream; callers page through by advancing `from`.
    fn read_from(&self, stream: &str, from: u64, max: usize) -> Result<Vec<SequencedRecord>>;

    /// Append a batch of records, all-or-nothing, and return the new stream
    /// length. Fails with `AppendConflict` when `expected` is `Exact` and
    /// does not match the current length.
    fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        records: Vec<Record>,
    ) -> Result<u64>;
}
