//! Data block dialect (`0x55`) frames
//!
//! ```text
//! 55 | line count | block index (2, LE) | payload (fixed size)
//! ```

use crate::{ProtocolError, Result};

/// Leading marker byte of every data block.
pub const BLOCK_MARKER: u8 = 0x55;
pub const BLOCK_HEADER_SIZE: usize = 4;

/// Payload sizes seen in captures: one block per 20-byte write, or one
/// 384-dot line per block.
pub const BLOCK_SIZE_SHORT: usize = 16;
pub const BLOCK_SIZE_LINE: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub line_count: u8,
    pub index: u16,
    pub payload: Vec<u8>,
}

impl DataBlock {
    pub fn new(line_count: u8, index: u16, payload: impl Into<Vec<u8>>) -> Self {
        Self { line_count, index, payload: payload.into() }
    }

    /// Encode, enforcing the configured payload size.
    pub fn encode(&self, block_size: usize) -> Result<Vec<u8>> {
        if self.payload.len() != block_size {
            return Err(ProtocolError::MalformedBlock {
                expected: block_size,
                actual: self.payload.len(),
            });
        }

        let mut out = Vec::with_capacity(BLOCK_HEADER_SIZE + block_size);
        out.push(BLOCK_MARKER);
        out.push(self.line_count);
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    pub fn decode(bytes: &[u8], block_size: usize) -> Result<Self> {
        if bytes.first() != Some(&BLOCK_MARKER) {
            return Err(ProtocolError::malformed_frame("data block must start with 0x55"));
        }
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(ProtocolError::MalformedBlock { expected: block_size, actual: 0 });
        }

        let payload = &bytes[BLOCK_HEADER_SIZE..];
        if payload.len() != block_size {
            return Err(ProtocolError::MalformedBlock {
                expected: block_size,
                actual: payload.len(),
            });
        }

        Ok(Self {
            line_count: bytes[1],
            index: u16::from_le_bytes([bytes[2], bytes[3]]),
            payload: payload.to_vec(),
        })
    }
}
