//! # logveil
//!
//! A migration pipeline that rewrites a plaintext append-only event log into
//! an equivalent log where personally-identifying fields are replaced by
//! authenticated ciphertext:
//! - AES-256-GCM envelope encryption of individual string fields
//! - Type-tag driven transform policy (copy vs. encrypt-fields)
//! - Strictly ordered single-pass migration with bounded conflict retry
//! - Cursor-based resume and cooperative cancellation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   read (in order)   ┌─────────────────────┐
//! │  Source Log  ├────────────────────▶│  MigrationPipeline  │
//! └──────────────┘                     └──────────┬──────────┘
//!                                                 │ per record
//!                                      ┌──────────▼──────────┐
//!                                      │  RecordTransformer  │
//!                                      │  (policy dispatch)  │
//!                                      └──────────┬──────────┘
//!                                                 │ PII fields
//!                                      ┌──────────▼──────────┐
//!                                      │   CryptoEnvelope    │
//!                                      │   (AES-256-GCM)     │
//!                                      └──────────┬──────────┘
//!                                                 │ append (expect revision)
//!                                      ┌──────────▼──────────┐
//!                                      │   Destination Log   │
//!                                      └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod crypto;
pub mod log;
pub mod transform;
pub mod pipeline;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VeilError};
pub use config::MigrationConfig;
pub use crypto::{CryptoEnvelope, EncryptedField, EncryptionKey, KeyProvider, StaticKeyProvider};
pub use log::{EventLog, ExpectedRevision, FileLog, MemoryLog, Record, SequencedRecord};
pub use pipeline::{CancelToken, MigrationCursor, MigrationPipeline, MigrationReport};
pub use transform::{RecordTransformer, TransformPolicy, TransformRule};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of logveil
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
