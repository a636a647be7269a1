//! Migration pipeline
//!
//! Drives the end-to-end process: read the source log in order, transform
//! each record, append the outputs to the destination log, and track the
//! cursor for resumption.
//!
//! ## Responsibilities
//! - Strictly sequential single-pass migration (read = transform = append order)
//! - Optimistic append with bounded conflict retry
//! - Cooperative cancellation between records
//! - Per-record outcome reporting

mod cursor;
mod migrator;
mod report;

pub use cursor::MigrationCursor;
pub use migrator::{CancelToken, MigrationPipeline};
pub use report::{MigrationReport, RecordAction, RecordOutcome};
