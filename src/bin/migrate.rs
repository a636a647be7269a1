//! logveil Migration Binary
//!
//! Runs one bounded migration pass over a file-backed log.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use logveil::{
    EncryptionKey, FileLog, MigrationConfig, MigrationCursor, MigrationPipeline,
    RecordTransformer, StaticKeyProvider, TransformPolicy, VeilError,
};

/// logveil migration runner
#[derive(Parser, Debug)]
#[command(name = "logveil-migrate")]
#[command(about = "Migrate an append-only log, replacing PII fields with authenticated ciphertext")]
#[command(version)]
struct Args {
    /// Data directory holding the stream files
    #[arg(short, long, default_value = "./logveil_data")]
    data_dir: PathBuf,

    /// Source stream name
    #[arg(short, long)]
    source: String,

    /// Destination stream name
    #[arg(short = 'o', long)]
    destination: String,

    /// File holding the hex-encoded 256-bit key
    #[arg(short, long)]
    key_file: PathBuf,

    /// JSON file mapping record types to transform rules
    #[arg(short, long)]
    policy_file: PathBuf,

    /// Cursor file persisted between runs
    #[arg(short = 'c', long, default_value = "./logveil_cursor.json")]
    cursor_file: PathBuf,

    /// Resume from the cursor file instead of the start of the stream
    #[arg(long)]
    resume: bool,

    /// Records to pull from the source per read
    #[arg(long, default_value = "256")]
    batch_size: usize,

    /// Append conflict retries before the run fails
    #[arg(long, default_value = "3")]
    max_retries: u32,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,logveil=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("logveil v{}", logveil::VERSION);

    if let Err(e) = run(args) {
        tracing::error!("migration failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), VeilError> {
    if args.source == args.destination {
        return Err(VeilError::Config(
            "source and destination streams must differ".to_string(),
        ));
    }

    let key = load_key(&args.key_file)?;
    let policy = load_policy(&args.policy_file)?;

    let mut builder = MigrationConfig::builder()
        .source_stream(&args.source)
        .destination_stream(&args.destination)
        .read_batch_size(args.batch_size)
        .max_append_retries(args.max_retries);

    if args.resume {
        let cursor = MigrationCursor::load(&args.cursor_file)?;
        tracing::info!(
            stream = %cursor.source_stream,
            last_migrated = ?cursor.last_migrated,
            "resuming from cursor file"
        );
        builder = builder.resume_from(cursor);
    }

    let log = FileLog::open(&args.data_dir)?;
    let transformer = RecordTransformer::new(policy, Arc::new(StaticKeyProvider::new(key)));
    let pipeline = MigrationPipeline::new(builder.build(), transformer);

    let report = match pipeline.migrate(&log, &log) {
        Ok(report) => report,
        Err(e) => {
            // An aborted run still made progress; persist its resume point
            // so the next --resume run picks up after the last-good record
            // instead of duplicating everything already appended.
            if let VeilError::Aborted { cursor, .. } = &e {
                cursor.store(&args.cursor_file)?;
                tracing::warn!(
                    last_migrated = ?cursor.last_migrated,
                    cursor_file = %args.cursor_file.display(),
                    "run aborted, cursor persisted for resume"
                );
            }
            return Err(e);
        }
    };

    report.cursor.store(&args.cursor_file)?;
    tracing::info!(
        migrated = report.migrated(),
        copied = report.copied(),
        completed = report.completed,
        cursor_file = %args.cursor_file.display(),
        "run finished, cursor persisted"
    );
    Ok(())
}

/// Read a hex-encoded 256-bit key from a file
fn load_key(path: &PathBuf) -> Result<EncryptionKey, VeilError> {
    let hex_str = fs::read_to_string(path)?;
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| VeilError::Config(format!("key file is not valid hex: {}", e)))?;
    EncryptionKey::from_slice(&bytes)
}

/// Read a transform policy from a JSON file
fn load_policy(path: &PathBuf) -> Result<TransformPolicy, VeilError> {
    let json = fs::read_to_string(path)?;
    let policy: TransformPolicy = serde_json::from_str(&json)?;
    if policy.is_empty() {
        return Err(VeilError::Config(
            "policy file classifies no record types".to_string(),
        ));
    }
    Ok(policy)
}
