//! Migration driver
//!
//! Single-pass and single-writer: within one run, record processing is
//! strictly sequential so destination append order equals source read
//! order. The only concurrency hazard is a destination append conflict,
//! arbitrated by a bounded retry against the freshest stream length.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::error::{Result, VeilError};
use crate::log::{EventLog, ExpectedRevision, Record};
use crate::transform::{RecordTransformer, TransformRule};

use super::{MigrationCursor, MigrationReport, RecordAction, RecordOutcome};

/// Cooperative cancellation handle
///
/// Cloneable; `cancel()` from any thread halts the run between records.
/// The in-flight record finishes its transform/append first, so the cursor
/// always reflects the last fully-appended source position.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to halt after the current record
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The end-to-end migration driver
pub struct MigrationPipeline {
    config: MigrationConfig,
    transformer: RecordTransformer,
    cancel: CancelToken,
}

impl MigrationPipeline {
    pub fn new(config: MigrationConfig, transformer: RecordTransformer) -> Self {
        Self {
            config,
            transformer,
            cancel: CancelToken::new(),
        }
    }

    /// Handle for cancelling this pipeline's runs from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The configuration driving this pipeline
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run one bounded batch pass over the source stream
    ///
    /// The run covers every record visible at the source's length as
    /// observed here at the start; records appended concurrently are left
    /// for a later run.
    ///
    /// Steps per record, strictly in order:
    /// 1. Check for cancellation
    /// 2. Transform (copy or encrypt fields)
    /// 3. Append outputs with `ExpectedRevision::Exact`, retrying a
    ///    conflict a bounded number of times against the refreshed length
    /// 4. Advance the cursor
    pub fn migrate(
        &self,
        source: &dyn EventLog,
        destination: &dyn EventLog,
    ) -> Result<MigrationReport> {
        let src = &self.config.source_stream;
        let dst = &self.config.destination_stream;

        let mut cursor = match &self.config.resume_from {
            Some(cursor) if cursor.source_stream != *src => {
                return Err(VeilError::Config(format!(
                    "resume cursor tracks stream '{}', run reads '{}'",
                    cursor.source_stream, src
                )));
            }
            Some(cursor) => cursor.clone(),
            None => MigrationCursor::start_of(src.clone()),
        };

        // The run's horizon: source growth after this point is out of scope
        let source_len = source.stream_length(src)?;
        let mut dest_len = destination.stream_length(dst)?;

        info!(
            source = %src,
            destination = %dst,
            from = cursor.next_position(),
            horizon = source_len,
            "starting migration run"
        );

        let mut outcomes = Vec::new();
        let mut next = cursor.next_position();

        while next < source_len {
            if self.cancel.is_cancelled() {
                info!(processed = outcomes.len(), "run cancelled, halting between records");
                return Ok(MigrationReport {
                    outcomes,
                    completed: false,
                    cursor,
                });
            }

            let remaining = (source_len - next) as usize;
            let batch = source.read_from(src, next, remaining.min(self.config.read_batch_size))?;
            if batch.is_empty() {
                // Append-only streams never shrink below an observed length
                return Err(VeilError::Corruption(format!(
                    "stream '{}' ended at {} before observed length {}",
                    src, next, source_len
                )));
            }

            for sequenced in batch {
                if self.cancel.is_cancelled() {
                    info!(processed = outcomes.len(), "run cancelled, halting between records");
                    return Ok(MigrationReport {
                        outcomes,
                        completed: false,
                        cursor,
                    });
                }

                let position = sequenced.position;
                let record = sequenced.record;

                let outputs = self.transformer.transform(&record).map_err(|e| {
                    warn!(
                        stream = %src,
                        position,
                        record_id = %record.id,
                        error = %e,
                        "transform failed, aborting run"
                    );
                    Self::abort(src, position, record.id, &cursor, e)
                })?;

                dest_len = self
                    .append_outputs(destination, dst, position, dest_len, outputs)
                    .map_err(|e| Self::abort(src, position, record.id, &cursor, e))?;

                let action = self.action_for(&record);
                debug!(position, record_id = %record.id, ?action, "record appended");

                cursor.advance(position);
                outcomes.push(RecordOutcome {
                    position,
                    id: record.id,
                    action,
                });
                next = position + 1;
            }
        }

        let report = MigrationReport {
            outcomes,
            completed: true,
            cursor,
        };
        info!(
            migrated = report.migrated(),
            copied = report.copied(),
            "migration run complete"
        );
        Ok(report)
    }

    /// Wrap a per-record failure with the record's identity and the
    /// last-good cursor so callers can persist the resume point
    fn abort(
        stream: &str,
        position: u64,
        record_id: uuid::Uuid,
        cursor: &MigrationCursor,
        source: VeilError,
    ) -> VeilError {
        VeilError::Aborted {
            stream: stream.to_string(),
            position,
            record_id,
            cursor: cursor.clone(),
            source: Box::new(source),
        }
    }

    /// Append one record's outputs, all-or-nothing, with bounded conflict
    /// retry; returns the new destination length
    fn append_outputs(
        &self,
        destination: &dyn EventLog,
        dst: &str,
        source_position: u64,
        mut dest_len: u64,
        outputs: Vec<Record>,
    ) -> Result<u64> {
        if outputs.is_empty() {
            return Ok(dest_len);
        }

        let mut attempts = 0;
        loop {
            match destination.append(dst, ExpectedRevision::Exact(dest_len), outputs.clone()) {
                Ok(new_len) => return Ok(new_len),
                Err(VeilError::AppendConflict { actual, .. })
                    if attempts < self.config.max_append_retries =>
                {
                    attempts += 1;
                    warn!(
                        stream = %dst,
                        source_position,
                        expected = dest_len,
                        actual,
                        attempt = attempts,
                        "append conflict, retrying against refreshed length"
                    );
                    dest_len = destination.stream_length(dst)?;
                }
                Err(e) => {
                    warn!(
                        stream = %dst,
                        source_position,
                        error = %e,
                        "append failed, aborting run"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Classify the outcome from the policy rule; `transform` already
    /// succeeded, so the type is known
    fn action_for(&self, record: &Record) -> RecordAction {
        match self.transformer.policy().rule_for(&record.record_type) {
            Some(TransformRule::Copy) => RecordAction::Copied,
            _ => RecordAction::Migrated,
        }
    }
}
