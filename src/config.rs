//! Configuration for a migration run
//!
//! Centralized configuration with sensible defaults.

use crate::pipeline::MigrationCursor;

/// Configuration for one migration run
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    // -------------------------------------------------------------------------
    // Stream Configuration
    // -------------------------------------------------------------------------
    /// Stream to read plaintext records from
    pub source_stream: String,

    /// Stream to append transformed records to
    pub destination_stream: String,

    // -------------------------------------------------------------------------
    // Pipeline Configuration
    // -------------------------------------------------------------------------
    /// How many records to pull from the source per read call
    pub read_batch_size: usize,

    /// Bounded retry count for destination append conflicts before the run
    /// fails with `AppendConflict`
    pub max_append_retries: u32,

    /// Resume point from a previous run; `None` starts at position 0
    pub resume_from: Option<MigrationCursor>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_stream: "events".to_string(),
            destination_stream: "events-encrypted".to_string(),
            read_batch_size: 256,
            max_append_retries: 3,
            resume_from: None,
        }
    }
}

impl MigrationConfig {
    /// Create a new config builder
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder::default()
    }
}

/// Builder for MigrationConfig
#[derive(Default)]
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
}

impl MigrationConfigBuilder {
    /// Set the source stream name
    pub fn source_stream(mut self, name: impl Into<String>) -> Self {
        self.config.source_stream = name.into();
        self
    }

    /// Set the destination stream name
    pub fn destination_stream(mut self, name: impl Into<String>) -> Self {
        self.config.destination_stream = name.into();
        self
    }

    /// Set the read batch size; clamped to at least 1 so a run always
    /// makes forward progress
    pub fn read_batch_size(mut self, size: usize) -> Self {
        self.config.read_batch_size = size.max(1);
        self
    }

    /// Set the append conflict retry bound
    pub fn max_append_retries(mut self, retries: u32) -> Self {
        self.config.max_append_retries = retries;
        self
    }

    /// Resume from a cursor produced by a previous run
    pub fn resume_from(mut self, cursor: MigrationCursor) -> Self {
        self.config.resume_from = Some(cursor);
        self
    }

    pub fn build(self) -> MigrationConfig {
        self.config
    }
}
