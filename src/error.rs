//! Error types for logveil
//!
//! Provides a unified error type for all operations. No error is silently
//! swallowed: every failure aborts the current migration run with enough
//! context (stream name, record id, position) to resume deterministically.

use thiserror::Error;

/// Result type alias using VeilError
pub type Result<T> = std::result::Result<T, VeilError>;

/// Unified error type for logveil operations
#[derive(Debug, Error)]
pub enum VeilError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Envelope Errors
    // -------------------------------------------------------------------------
    /// Input is not a validly encoded envelope or payload
    #[error("Format error: {0}")]
    Format(String),

    /// Ciphertext failed authentication on decrypt. Never masked: tampered
    /// data must fail, not decrypt to garbage.
    #[error("Integrity error: {0}")]
    Integrity(String),

    // -------------------------------------------------------------------------
    // Transform Errors
    // -------------------------------------------------------------------------
    /// Record type not classified by the transform policy. Fatal by design:
    /// an unflagged type could carry PII straight through.
    #[error("Unknown record type: {record_type}")]
    UnknownType { record_type: String },

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    /// Optimistic append rejected: the stream grew underneath us
    #[error(
        "Append conflict on stream '{stream}': expected revision {expected}, actual {actual}"
    )]
    AppendConflict {
        stream: String,
        expected: u64,
        actual: u64,
    },

    /// Damaged frame in a file-backed log
    #[error("Log corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// A migration run aborted mid-stream. Carries the failing record's
    /// identity and the last-good cursor so the run can resume
    /// deterministically after remediation.
    #[error(
        "migration aborted at stream '{stream}' position {position} (record {record_id}): {source}"
    )]
    Aborted {
        stream: String,
        position: u64,
        record_id: uuid::Uuid,
        /// Resume point: the last source position fully in the destination
        cursor: crate::pipeline::MigrationCursor,
        #[source]
        source: Box<VeilError>,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for VeilError {
    fn from(err: bincode::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}
