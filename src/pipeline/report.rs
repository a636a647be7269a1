//! Migration report
//!
//! Per-record outcomes and counts for one run. A record that fails aborts
//! the run with an error carrying stream, id, and position, so the report
//! enumerates only records that reached the destination.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MigrationCursor;

/// What happened to one source record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordAction {
    /// Sensitive type: fields enveloped, re-emitted under the target type
    Migrated,

    /// Non-sensitive type: structural copy
    Copied,
}

/// Outcome for one source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Source position of the record
    pub position: u64,

    /// Source record id
    pub id: Uuid,

    /// How the record was handled
    pub action: RecordAction,
}

/// Result of one migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Per-record outcomes, in source order
    pub outcomes: Vec<RecordOutcome>,

    /// Whether the run consumed every record visible at its start.
    /// `false` means the run was cancelled and can resume from `cursor`.
    pub completed: bool,

    /// Last fully-appended source position; the resume point
    pub cursor: MigrationCursor,
}

impl MigrationReport {
    /// Records whose fields were encrypted
    pub fn migrated(&self) -> u64 {
        self.count(RecordAction::Migrated)
    }

    /// Records copied through unchanged
    pub fn copied(&self) -> u64 {
        self.count(RecordAction::Copied)
    }

    /// Total records processed
    pub fn total(&self) -> u64 {
        self.outcomes.len() as u64
    }

    fn count(&self, action: RecordAction) -> u64 {
        self.outcomes.iter().filter(|o| o.action == action).count() as u64
    }
}
