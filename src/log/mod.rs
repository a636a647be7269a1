//! Ordered append-only log service
//!
//! The pipeline treats log storage as an abstract collaborator: named
//! streams of immutable records with strictly-increasing positions,
//! readable from any position and appendable with an optimistic revision
//! precondition.
//!
//! ## Responsibilities
//! - `EventLog` trait: read-from-position, append-if-expected-revision
//! - `MemoryLog`: in-memory reference implementation
//! - `FileLog`: one append-only frame file per stream
//!
//! ## Frame Format (FileLog)
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Frame 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ POS (8) │ CRC (4) │Len (4) │ Record │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Frame 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ POS (8) │ CRC (4) │Len (4) │ Record │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```

mod file;
mod frame;
mod memory;
mod record;
mod store;

pub use file::FileLog;
pub use memory::MemoryLog;
pub use record::{Record, SequencedRecord};
pub use store::{EventLog, ExpectedRevision};
