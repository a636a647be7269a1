//! Record definitions
//!
//! A record is the immutable unit of a log: assigned an id once, never
//! mutated after creation. A logical "update" is a new record of a newer
//! type tag.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Globally unique identifier, assigned once, never reused
    pub id: Uuid,

    /// Type tag identifying the record's schema/version
    pub record_type: String,

    /// Opaque serialized payload (JSON object for typed schemas)
    pub payload: Bytes,

    /// Optional opaque metadata
    pub metadata: Option<Bytes>,
}

impl Record {
    /// Create a record with a freshly minted id
    pub fn new(record_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_type: record_type.into(),
            payload: payload.into(),
            metadata: None,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// A record as read back from a stream, together with its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedRecord {
    /// Position in the stream (strictly increasing, immutable once assigned)
    pub position: u64,

    /// The record stored at that position
    pub record: Record,
}
