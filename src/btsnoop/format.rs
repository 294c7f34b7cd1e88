//! Standard capture file structures
//!
//! A btsnoop file is a fixed header followed by records, all big-endian:
//!
//! 1. **File Header** (16 bytes) - magic `btsnoop\0`, version 1, datalink 1002
//! 2. **Record Header** (24 bytes) - original length, included length, flags,
//!    drops, timestamp high word, timestamp low word
//! 3. **Record Payload** - `included length` bytes starting with the HCI
//!    transport type byte

use crate::types::CaptureRecord;
use crate::{ProtocolError, Result};
use tracing::trace;

/// File magic, including its terminating NUL.
pub const CAPTURE_MAGIC: [u8; 8] = *b"btsnoop\0";
/// The only supported file format version.
pub const CAPTURE_VERSION: u32 = 1;
/// Datalink type for HCI UART (H4) framing.
pub const DATALINK_HCI_UART: u32 = 1002;

pub const FILE_HEADER_SIZE: usize = 16;
pub const RECORD_HEADER_SIZE: usize = 24;

/// Capture file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFileHeader {
    pub version: u32,
    pub datalink: u32,
}

impl Default for CaptureFileHeader {
    fn default() -> Self {
        Self { version: CAPTURE_VERSION, datalink: DATALINK_HCI_UART }
    }
}

impl CaptureFileHeader {
    /// Parse and validate a file header. Every field must match exactly.
    pub fn parse(data: &[u8; FILE_HEADER_SIZE]) -> Result<Self> {
        if data[..8] != CAPTURE_MAGIC {
            return Err(ProtocolError::InvalidCaptureHeader {
                details: format!("bad magic {:02x?}", &data[..8]),
            });
        }

        let version = be_u32(data, 8);
        if version != CAPTURE_VERSION {
            return Err(ProtocolError::InvalidCaptureHeader {
                details: format!("version {} (expected {})", version, CAPTURE_VERSION),
            });
        }

        let datalink = be_u32(data, 12);
        if datalink != DATALINK_HCI_UART {
            return Err(ProtocolError::InvalidCaptureHeader {
                details: format!("datalink {} (expected {})", datalink, DATALINK_HCI_UART),
            });
        }

        trace!(version, datalink, "Parsed capture file header");
        Ok(Self { version, datalink })
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut out = [0u8; FILE_HEADER_SIZE];
        out[..8].copy_from_slice(&CAPTURE_MAGIC);
        out[8..12].copy_from_slice(&self.version.to_be_bytes());
        out[12..].copy_from_slice(&self.datalink.to_be_bytes());
        out
    }
}

/// Per-record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub original_len: u32,
    pub included_len: u32,
    pub flags: u32,
    pub drops: u32,
    /// Microseconds since the capture epoch, stored as two 32-bit words
    pub timestamp: u64,
}

impl RecordHeader {
    pub fn parse(data: &[u8; RECORD_HEADER_SIZE]) -> Self {
        let high = u64::from(be_u32(data, 16));
        let low = u64::from(be_u32(data, 20));
        Self {
            original_len: be_u32(data, 0),
            included_len: be_u32(data, 4),
            flags: be_u32(data, 8),
            drops: be_u32(data, 12),
            timestamp: (high << 32) | low,
        }
    }

    /// Header describing `record`, with the included length taken from its payload.
    pub fn for_record(record: &CaptureRecord) -> Self {
        Self {
            original_len: record.original_len,
            included_len: record.included_len(),
            flags: record.flags,
            drops: record.drops,
            timestamp: record.timestamp,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.original_len.to_be_bytes());
        out.extend_from_slice(&self.included_len.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&self.drops.to_be_bytes());
        out.extend_from_slice(&((self.timestamp >> 32) as u32).to_be_bytes());
        out.extend_from_slice(&(self.timestamp as u32).to_be_bytes());
    }
}

fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
