//! Migration cursor
//!
//! The source position up to which all records have been transformed and
//! fully appended to the destination. Resume is idempotent because the
//! cursor reflects "last appended", not "last read".

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Resume point for a migration run
///
/// Serializable so the invoking collaborator can persist it between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCursor {
    /// The stream this cursor tracks
    pub source_stream: String,

    /// Last source position whose outputs are fully in the destination;
    /// `None` before the first record lands
    pub last_migrated: Option<u64>,
}

impl MigrationCursor {
    /// A cursor at the start of a stream
    pub fn start_of(source_stream: impl Into<String>) -> Self {
        Self {
            source_stream: source_stream.into(),
            last_migrated: None,
        }
    }

    /// The next source position to read
    pub fn next_position(&self) -> u64 {
        self.last_migrated.map_or(0, |p| p + 1)
    }

    /// Record that `position` is fully appended to the destination
    pub fn advance(&mut self, position: u64) {
        self.last_migrated = Some(position);
    }

    /// Load a cursor from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Persist the cursor to a JSON file
    pub fn store(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
