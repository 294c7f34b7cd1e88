//! Packed 1-bpp bitmaps and their split into data blocks

use super::block::DataBlock;
use crate::{ProtocolError, Result};

/// A rasterized image as produced by the caller's renderer.
///
/// Rows are packed most significant bit first, padded to whole bytes, and a
/// set bit prints black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u16, height: u16, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ProtocolError::malformed_frame(format!(
                "bitmap dimensions {}x{} must be non-zero",
                width, height
            )));
        }
        let expected = Self::row_bytes_for(width) * height as usize;
        if data.len() != expected {
            return Err(ProtocolError::malformed_frame(format!(
                "{}x{} bitmap needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// All-white bitmap.
    pub fn blank(width: u16, height: u16) -> Result<Self> {
        Self::new(width, height, vec![0u8; Self::row_bytes_for(width) * height as usize])
    }

    fn row_bytes_for(width: u16) -> usize {
        (width as usize).div_ceil(8)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn row_bytes(&self) -> usize {
        Self::row_bytes_for(self.width)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn row(&self, y: u16) -> Option<&[u8]> {
        let row_bytes = self.row_bytes();
        let start = y as usize * row_bytes;
        self.data.get(start..start + row_bytes)
    }

    /// Split the raster into fixed-size blocks, zero-padding the last one.
    pub fn to_blocks(&self, block_size: usize, line_count: u8) -> Result<Vec<DataBlock>> {
        if block_size == 0 {
            return Err(ProtocolError::config_error("data block size must be non-zero"));
        }

        let count = self.data.len().div_ceil(block_size);
        if count > usize::from(u16::MAX) + 1 {
            return Err(ProtocolError::malformed_frame(format!(
                "bitmap needs {} blocks, more than a 16-bit block index can address",
                count
            )));
        }

        Ok(self
            .data
            .chunks(block_size)
            .enumerate()
            .map(|(index, chunk)| {
                let mut payload = chunk.to_vec();
                payload.resize(block_size, 0);
                DataBlock::new(line_count, index as u16, payload)
            })
            .collect())
    }

    /// Encoded block frames back to back, ready for the transfer scheduler.
    pub fn block_stream(&self, block_size: usize, line_count: u8) -> Result<Vec<u8>> {
        let blocks = self.to_blocks(block_size, line_count)?;
        let mut stream = Vec::with_capacity(blocks.len() * (block_size + 4));
        for block in &blocks {
            stream.extend_from_slice(&block.encode(block_size)?);
        }
        Ok(stream)
    }
}
