//! Tests for the migration pipeline
//!
//! These tests verify:
//! - Relative order of transformed outputs matches source order
//! - Append conflicts are retried, then fatal after the bound
//! - Unknown types abort with nothing appended for the failing record
//! - Cancellation halts between records; resume is idempotent

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use logveil::{
    CancelToken, CryptoEnvelope, EncryptedField, EncryptionKey, EventLog, ExpectedRevision,
    MemoryLog, MigrationConfig, MigrationPipeline, Record, RecordTransformer, SequencedRecord,
    StaticKeyProvider, TransformPolicy, VeilError,
};

const SOURCE: &str = "accounts";
const DEST: &str = "accounts-encrypted";

fn policy() -> TransformPolicy {
    TransformPolicy::new()
        .copy("Created")
        .encrypt_fields("DetailsUpdated", "DetailsUpdatedV2", ["Name"])
}

fn pipeline(key: &EncryptionKey) -> MigrationPipeline {
    let transformer =
        RecordTransformer::new(policy(), Arc::new(StaticKeyProvider::new(key.clone())));
    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .build();
    MigrationPipeline::new(config, transformer)
}

fn created(n: u32) -> Record {
    Record::new("Created", Bytes::from(format!("{{\"n\":{}}}", n)))
}

fn details(name: &str) -> Record {
    Record::new("DetailsUpdated", Bytes::from(format!("{{\"Name\":\"{}\"}}", name)))
}

fn seed_source(records: &[Record]) -> MemoryLog {
    let log = MemoryLog::new();
    log.append(SOURCE, ExpectedRevision::Exact(0), records.to_vec()).unwrap();
    log
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_relative_order_is_preserved() {
    let key = EncryptionKey::generate();
    let r1 = created(1);
    let r2 = details("Alice");
    let r3 = created(3);
    let source = seed_source(&[r1.clone(), r2.clone(), r3.clone()]);
    let destination = MemoryLog::new();

    let report = pipeline(&key).migrate(&source, &destination).unwrap();
    assert!(report.completed);
    assert_eq!(report.copied(), 2);
    assert_eq!(report.migrated(), 1);

    let dest = destination.read_from(DEST, 0, 10).unwrap();
    assert_eq!(dest.len(), 3);
    assert_eq!(dest[0].record, r1);
    assert_eq!(dest[1].record.record_type, "DetailsUpdatedV2");
    assert_eq!(dest[2].record, r3);
}

#[test]
fn test_empty_source_completes_immediately() {
    let key = EncryptionKey::generate();
    let source = MemoryLog::new();
    let destination = MemoryLog::new();

    let report = pipeline(&key).migrate(&source, &destination).unwrap();
    assert!(report.completed);
    assert_eq!(report.total(), 0);
    assert_eq!(destination.stream_length(DEST).unwrap(), 0);
}

#[test]
fn test_small_batches_cover_the_whole_stream() {
    let key = EncryptionKey::generate();
    let records: Vec<Record> = (0..17).map(created).collect();
    let source = seed_source(&records);
    let destination = MemoryLog::new();

    let transformer =
        RecordTransformer::new(policy(), Arc::new(StaticKeyProvider::new(key.clone())));
    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .read_batch_size(4)
        .build();
    let report = MigrationPipeline::new(config, transformer)
        .migrate(&source, &destination)
        .unwrap();

    assert_eq!(report.total(), 17);
    assert_eq!(destination.stream_length(DEST).unwrap(), 17);
}

#[test]
fn test_zero_batch_size_is_clamped_and_the_run_still_progresses() {
    let key = EncryptionKey::generate();
    let source = seed_source(&[created(1), created(2)]);
    let destination = MemoryLog::new();

    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .read_batch_size(0)
        .build();
    assert_eq!(config.read_batch_size, 1);

    let transformer =
        RecordTransformer::new(policy(), Arc::new(StaticKeyProvider::new(key.clone())));
    let report = MigrationPipeline::new(config, transformer)
        .migrate(&source, &destination)
        .unwrap();
    assert!(report.completed);
    assert_eq!(report.total(), 2);
}

// =============================================================================
// Unknown Type Tests
// =============================================================================

#[test]
fn test_unknown_type_aborts_with_nothing_appended_for_it() {
    let key = EncryptionKey::generate();
    let good = created(1);
    let bad = Record::new("Mystery", Bytes::from_static(b"{}"));
    let source = seed_source(&[good.clone(), bad]);
    let destination = MemoryLog::new();

    let err = pipeline(&key).migrate(&source, &destination).unwrap_err();
    match err {
        VeilError::Aborted { source, .. } => {
            assert!(
                matches!(*source, VeilError::UnknownType { record_type } if record_type == "Mystery")
            );
        }
        other => panic!("expected Aborted, got {:?}", other),
    }

    // The record before the failure landed; the failing record did not
    let dest = destination.read_from(DEST, 0, 10).unwrap();
    assert_eq!(dest.len(), 1);
    assert_eq!(dest[0].record, good);
}

#[test]
fn test_aborted_run_names_the_failing_record_and_resume_point() {
    let key = EncryptionKey::generate();
    let bad = Record::new("Mystery", Bytes::from_static(b"{}"));
    let bad_id = bad.id;
    let source = seed_source(&[created(1), bad, created(2)]);
    let destination = MemoryLog::new();

    let err = pipeline(&key).migrate(&source, &destination).unwrap_err();
    match err {
        VeilError::Aborted {
            stream,
            position,
            record_id,
            cursor,
            ..
        } => {
            assert_eq!(stream, SOURCE);
            assert_eq!(position, 1);
            assert_eq!(record_id, bad_id);
            // The cursor covers exactly the records already appended
            assert_eq!(cursor.source_stream, SOURCE);
            assert_eq!(cursor.last_migrated, Some(0));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }
}

#[test]
fn test_resume_after_remediation_does_not_duplicate_appended_records() {
    let key = EncryptionKey::generate();
    let first = created(1);
    let bad = Record::new("Mystery", Bytes::from_static(b"{}"));
    let last = created(2);
    let source = seed_source(&[first.clone(), bad.clone(), last.clone()]);
    let destination = MemoryLog::new();

    let err = pipeline(&key).migrate(&source, &destination).unwrap_err();
    let cursor = match err {
        VeilError::Aborted { cursor, .. } => cursor,
        other => panic!("expected Aborted, got {:?}", other),
    };
    assert_eq!(destination.stream_length(DEST).unwrap(), 1);

    // Remediate: the operator adds a rule covering the failing type, then
    // resumes from the cursor the aborted run carried out.
    let remediated = policy().copy("Mystery");
    let transformer =
        RecordTransformer::new(remediated, Arc::new(StaticKeyProvider::new(key.clone())));
    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .resume_from(cursor)
        .build();
    let report = MigrationPipeline::new(config, transformer)
        .migrate(&source, &destination)
        .unwrap();
    assert!(report.completed);
    assert_eq!(report.total(), 2);

    // Each source record landed exactly once, in order
    let dest = destination.read_from(DEST, 0, 10).unwrap();
    assert_eq!(dest.len(), 3);
    assert_eq!(dest[0].record, first);
    assert_eq!(dest[1].record, bad);
    assert_eq!(dest[2].record, last);
}

// =============================================================================
// Append Conflict Tests
// =============================================================================

/// Wraps a MemoryLog and simulates a concurrent writer: before each of the
/// first `injections` appends, it sneaks an extra record into the stream so
/// the caller's expected revision goes stale.
struct ContendedLog {
    inner: MemoryLog,
    injections: AtomicU32,
}

impl ContendedLog {
    fn new(injections: u32) -> Self {
        Self {
            inner: MemoryLog::new(),
            injections: AtomicU32::new(injections),
        }
    }
}

impl EventLog for ContendedLog {
    fn stream_length(&self, stream: &str) -> logveil::Result<u64> {
        self.inner.stream_length(stream)
    }

    fn read_from(
        &self,
        stream: &str,
        from: u64,
        max: usize,
    ) -> logveil::Result<Vec<SequencedRecord>> {
        self.inner.read_from(stream, from, max)
    }

    fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        records: Vec<Record>,
    ) -> logveil::Result<u64> {
        if self
            .injections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.inner
                .append(stream, ExpectedRevision::Any, vec![created(999)])?;
        }
        self.inner.append(stream, expected, records)
    }
}

#[test]
fn test_append_conflict_is_retried_once_then_succeeds() {
    let key = EncryptionKey::generate();
    let source = seed_source(&[created(1), created(2)]);
    let destination = ContendedLog::new(1);

    let report = pipeline(&key).migrate(&source, &destination).unwrap();
    assert!(report.completed);
    assert_eq!(report.total(), 2);

    // 2 migrated records + 1 injected intruder
    assert_eq!(destination.stream_length(DEST).unwrap(), 3);
}

#[test]
fn test_persistent_conflict_fails_after_bounded_retries() {
    let key = EncryptionKey::generate();
    let source = seed_source(&[created(1)]);
    let destination = ContendedLog::new(u32::MAX);

    let err = pipeline(&key).migrate(&source, &destination).unwrap_err();
    match err {
        VeilError::Aborted { source, .. } => {
            assert!(matches!(*source, VeilError::AppendConflict { stream, .. } if stream == DEST));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }
}

// =============================================================================
// Cancellation / Resume Tests
// =============================================================================

/// Cancels a token after `after` successful appends, simulating an operator
/// halting a running migration.
struct CancellingLog {
    inner: MemoryLog,
    token: CancelToken,
    remaining: AtomicU32,
}

impl CancellingLog {
    fn new(token: CancelToken, after: u32) -> Self {
        Self {
            inner: MemoryLog::new(),
            token,
            remaining: AtomicU32::new(after),
        }
    }
}

impl EventLog for CancellingLog {
    fn stream_length(&self, stream: &str) -> logveil::Result<u64> {
        self.inner.stream_length(stream)
    }

    fn read_from(
        &self,
        stream: &str,
        from: u64,
        max: usize,
    ) -> logveil::Result<Vec<SequencedRecord>> {
        self.inner.read_from(stream, from, max)
    }

    fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        records: Vec<Record>,
    ) -> logveil::Result<u64> {
        let new_len = self.inner.append(stream, expected, records)?;
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.token.cancel();
        }
        Ok(new_len)
    }
}

#[test]
fn test_pre_cancelled_run_processes_nothing() {
    let key = EncryptionKey::generate();
    let source = seed_source(&[created(1)]);
    let destination = MemoryLog::new();

    let p = pipeline(&key);
    p.cancel_token().cancel();

    let report = p.migrate(&source, &destination).unwrap();
    assert!(!report.completed);
    assert_eq!(report.total(), 0);
    assert_eq!(destination.stream_length(DEST).unwrap(), 0);
}

#[test]
fn test_cancel_then_resume_matches_uninterrupted_run() {
    let key = EncryptionKey::generate();
    let records = vec![created(1), details("Alice"), created(3), details("Bob")];

    // Uninterrupted reference run
    let reference = MemoryLog::new();
    pipeline(&key).migrate(&seed_source(&records), &reference).unwrap();

    // Interrupted run: halt after 2 appends, then resume from the cursor
    let interrupted_src = seed_source(&records);
    let p = pipeline(&key);
    let destination = CancellingLog::new(p.cancel_token(), 2);

    let halted = p.migrate(&interrupted_src, &destination).unwrap();
    assert!(!halted.completed);
    assert_eq!(halted.total(), 2);
    assert_eq!(halted.cursor.last_migrated, Some(1));
    assert_eq!(destination.stream_length(DEST).unwrap(), 2);

    let transformer =
        RecordTransformer::new(policy(), Arc::new(StaticKeyProvider::new(key.clone())));
    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .resume_from(halted.cursor)
        .build();
    let resumed = MigrationPipeline::new(config, transformer)
        .migrate(&interrupted_src, &destination)
        .unwrap();
    assert!(resumed.completed);
    assert_eq!(resumed.total(), 2);

    // Record-for-record equivalent to the uninterrupted run: no duplicates,
    // no gaps, same order. Envelopes differ (fresh nonces), so compare
    // structure and decrypted content.
    let want = reference.read_from(DEST, 0, 10).unwrap();
    let got = destination.read_from(DEST, 0, 10).unwrap();
    assert_eq!(got.len(), want.len());
    for (w, g) in want.iter().zip(&got) {
        assert_eq!(g.record.record_type, w.record.record_type);
        if g.record.record_type == "DetailsUpdatedV2" {
            let wp: Value = serde_json::from_slice(&w.record.payload).unwrap();
            let gp: Value = serde_json::from_slice(&g.record.payload).unwrap();
            let wn = EncryptedField::from_encoded(wp["Name"].as_str().unwrap());
            let gn = EncryptedField::from_encoded(gp["Name"].as_str().unwrap());
            assert_eq!(
                CryptoEnvelope::decrypt(&gn, &key).unwrap(),
                CryptoEnvelope::decrypt(&wn, &key).unwrap()
            );
        } else {
            assert_eq!(g.record, w.record);
        }
    }
}

#[test]
fn test_resume_cursor_for_wrong_stream_is_rejected() {
    let key = EncryptionKey::generate();
    let transformer =
        RecordTransformer::new(policy(), Arc::new(StaticKeyProvider::new(key.clone())));
    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .resume_from(logveil::MigrationCursor::start_of("other-stream"))
        .build();

    let err = MigrationPipeline::new(config, transformer)
        .migrate(&MemoryLog::new(), &MemoryLog::new())
        .unwrap_err();
    assert!(matches!(err, VeilError::Config(_)));
}

// =============================================================================
// Source Growth Tests
// =============================================================================

#[test]
fn test_records_appended_mid_run_are_out_of_scope() {
    // The horizon is the source length at the start of the run; a record
    // appended afterwards is picked up by a second run.
    let key = EncryptionKey::generate();
    let source = seed_source(&[created(1)]);
    let destination = MemoryLog::new();

    let first = pipeline(&key).migrate(&source, &destination).unwrap();
    assert_eq!(first.total(), 1);

    source.append(SOURCE, ExpectedRevision::Exact(1), vec![created(2)]).unwrap();

    let transformer =
        RecordTransformer::new(policy(), Arc::new(StaticKeyProvider::new(key.clone())));
    let config = MigrationConfig::builder()
        .source_stream(SOURCE)
        .destination_stream(DEST)
        .resume_from(first.cursor)
        .build();
    let second = MigrationPipeline::new(config, transformer)
        .migrate(&source, &destination)
        .unwrap();

    assert_eq!(second.total(), 1);
    assert_eq!(destination.stream_length(DEST).unwrap(), 2);
}
