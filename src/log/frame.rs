//! Log frame codec
//!
//! A frame is one record as stored on disk: a fixed header carrying the
//! stream position, a CRC32 of the record bytes, and the record length,
//! followed by the bincode-serialized record.

use crate::error::{Result, VeilError};

use super::Record;

/// Fixed frame header size: position (8) + crc (4) + len (4)
pub const HEADER_SIZE: usize = 16;

/// One record framed for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position of the record within its stream
    pub position: u64,

    /// The framed record
    pub record: Record,
}

impl Frame {
    pub fn new(position: u64, record: Record) -> Self {
        Self { position, record }
    }

    /// Serialize to `header ‖ record bytes`
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(&self.record)?;
        let crc = crc32(&data);

        let mut buf = Vec::with_capacity(HEADER_SIZE + data.len());
        buf.extend_from_slice(&self.position.to_le_bytes());
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&data);
        Ok(buf)
    }

    /// Decode one frame from the start of `buf`, returning it together with
    /// the number of bytes consumed.
    ///
    /// Errors with `Corruption` on a truncated header/body or a CRC
    /// mismatch; callers reading a file tail decide whether that means a
    /// torn write or real damage.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < HEADER_SIZE {
            return Err(VeilError::Corruption(format!(
                "truncated frame header: {} of {} bytes",
                buf.len(),
                HEADER_SIZE
            )));
        }

        let position = u64::from_le_bytes(buf[0..8].try_into().expect("8-byte slice"));
        let crc = u32::from_le_bytes(buf[8..12].try_into().expect("4-byte slice"));
        let len = u32::from_le_bytes(buf[12..16].try_into().expect("4-byte slice")) as usize;

        let end = HEADER_SIZE + len;
        if buf.len() < end {
            return Err(VeilError::Corruption(format!(
                "truncated frame body at position {}: {} of {} bytes",
                position,
                buf.len() - HEADER_SIZE,
                len
            )));
        }

        let data = &buf[HEADER_SIZE..end];
        let actual_crc = crc32(data);
        if actual_crc != crc {
            return Err(VeilError::Corruption(format!(
                "CRC mismatch at position {}: stored {:#010x}, computed {:#010x}",
                position, crc, actual_crc
            )));
        }

        let record: Record = bincode::deserialize(data)?;
        Ok((Self { position, record }, end))
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
