//! File-backed log implementation
//!
//! One append-only frame file per stream in a data directory. On open,
//! every stream file is scanned: frame CRCs are validated and a torn tail
//! (partial last write after a crash) is truncated away, while corruption in
//! the middle of a file is surfaced as an error.
//!
//! ## Concurrency
//! - `streams`: Protected by RwLock (many concurrent readers, exclusive writer)
//! - Reads open their own file handle, so they only need the read lock
//! - All methods use `&self`

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Result, VeilError};

use super::frame::{Frame, HEADER_SIZE};
use super::{EventLog, ExpectedRevision, Record, SequencedRecord};

const STREAM_EXTENSION: &str = "vlog";

/// Per-stream state: the append handle plus the byte offset of every frame
#[derive(Debug)]
struct StreamState {
    path: PathBuf,
    writer: File,
    /// Byte offset of each frame; `offsets.len()` is the stream length
    offsets: Vec<u64>,
    /// Total bytes of valid frames (the next write offset)
    len_bytes: u64,
}

/// A file-backed `EventLog`
#[derive(Debug)]
pub struct FileLog {
    data_dir: PathBuf,
    streams: RwLock<HashMap<String, StreamState>>,
}

impl FileLog {
    /// Open or create a log rooted at the given directory
    ///
    /// On startup:
    /// 1. Create the directory if it doesn't exist
    /// 2. Discover existing `*.vlog` stream files
    /// 3. Scan each file, validating CRCs and truncating torn tails
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let mut streams = HashMap::new();
        for entry in fs::read_dir(data_dir)? {
            let entry = entry?;
            let path = entry.path();

            if let Some(stream) = Self::parse_stream_name(&path) {
                let state = Self::open_stream(&path)?;
                debug!(stream = %stream, length = state.offsets.len(), "opened stream file");
                streams.insert(stream, state);
            }
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            streams: RwLock::new(streams),
        })
    }

    /// Data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// "accounts.vlog" → Some("accounts")
    fn parse_stream_name(path: &Path) -> Option<String> {
        if !path.is_file() || path.extension()? != STREAM_EXTENSION {
            return None;
        }
        Some(path.file_stem()?.to_string_lossy().into_owned())
    }

    fn stream_path(&self, stream: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", stream, STREAM_EXTENSION))
    }

    /// Open one stream file, scanning frames and truncating a torn tail
    fn open_stream(path: &Path) -> Result<StreamState> {
        let buf = match fs::read(path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut offsets = Vec::new();
        let mut cursor = 0usize;
        let mut valid_end = 0usize;

        while cursor < buf.len() {
            match Frame::decode(&buf[cursor..]) {
                Ok((frame, consumed)) => {
                    if frame.position != offsets.len() as u64 {
                        return Err(VeilError::Corruption(format!(
                            "{}: frame at offset {} claims position {}, expected {}",
                            path.display(),
                            cursor,
                            frame.position,
                            offsets.len()
                        )));
                    }
                    offsets.push(cursor as u64);
                    cursor += consumed;
                    valid_end = cursor;
                }
                Err(_) => {
                    // Only a torn tail is recoverable: a damaged frame with
                    // more data after it means real corruption.
                    let tail = buf.len() - cursor;
                    if Self::looks_like_torn_tail(&buf[cursor..]) {
                        warn!(
                            path = %path.display(),
                            discarded_bytes = tail,
                            "truncating torn tail after partial write"
                        );
                        break;
                    }
                    return Err(VeilError::Corruption(format!(
                        "{}: damaged frame at offset {} ({} bytes remain)",
                        path.display(),
                        cursor,
                        tail
                    )));
                }
            }
        }

        if valid_end < buf.len() {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_end as u64)?;
            file.sync_data()?;
        }

        let writer = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(StreamState {
            path: path.to_path_buf(),
            writer,
            offsets,
            len_bytes: valid_end as u64,
        })
    }

    /// A torn tail is shorter than its own header claims; a frame whose
    /// bytes are all present but fail the CRC is damage, not a torn write.
    fn looks_like_torn_tail(tail: &[u8]) -> bool {
        if tail.len() < HEADER_SIZE {
            return true;
        }
        let len = u32::from_le_bytes(tail[12..16].try_into().expect("4-byte slice")) as usize;
        tail.len() < HEADER_SIZE + len
    }

    /// Read frames `from..from+max` from an open stream file
    fn read_frames(state: &StreamState, from: u64, max: usize) -> Result<Vec<SequencedRecord>> {
        let start = from.min(state.offsets.len() as u64) as usize;
        let end = (start + max).min(state.offsets.len());
        if start >= end {
            return Ok(Vec::new());
        }

        let mut file = File::open(&state.path)?;
        file.seek(SeekFrom::Start(state.offsets[start]))?;

        let mut out = Vec::with_capacity(end - start);
        for _ in start..end {
            let frame = Self::read_one_frame(&mut file)?;
            out.push(SequencedRecord {
                position: frame.position,
                record: frame.record,
            });
        }
        Ok(out)
    }

    fn read_one_frame(file: &mut File) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;

        let len = u32::from_le_bytes(header[12..16].try_into().expect("4-byte slice")) as usize;
        let mut buf = Vec::with_capacity(HEADER_SIZE + len);
        buf.extend_from_slice(&header);
        buf.resize(HEADER_SIZE + len, 0);
        file.read_exact(&mut buf[HEADER_SIZE..])?;

        let (frame, _) = Frame::decode(&buf)?;
        Ok(frame)
    }
}

impl EventLog for FileLog {
    fn stream_length(&self, stream: &str) -> Result<u64> {
        let streams = self.streams.read();
        Ok(streams.get(stream).map_or(0, |s| s.offsets.len() as u64))
    }

    fn read_from(&self, stream: &str, from: u64, max: usize) -> Result<Vec<SequencedRecord>> {
        let streams = self.streams.read();
        match streams.get(stream) {
            Some(state) => Self::read_frames(state, from, max),
            None => Ok(Vec::new()),
        }
    }

    fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        records: Vec<Record>,
    ) -> Result<u64> {
        let mut streams = self.streams.write();

        let state = match streams.entry(stream.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Self::open_stream(&self.stream_path(stream))?),
        };

        let current = state.offsets.len() as u64;
        if let ExpectedRevision::Exact(expected_len) = expected {
            if current != expected_len {
                return Err(VeilError::AppendConflict {
                    stream: stream.to_string(),
                    expected: expected_len,
                    actual: current,
                });
            }
        }

        // Stage every frame in memory first so the batch lands with a single
        // write: either all frames hit the file or none do.
        let mut staged = Vec::new();
        let mut frame_offsets = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let frame = Frame::new(current + i as u64, record);
            frame_offsets.push(state.len_bytes + staged.len() as u64);
            staged.extend_from_slice(&frame.encode()?);
        }

        state.writer.write_all(&staged)?;
        state.writer.flush()?;
        state.writer.sync_data()?;

        state.len_bytes += staged.len() as u64;
        state.offsets.extend(frame_offsets);

        Ok(state.offsets.len() as u64)
    }
}
