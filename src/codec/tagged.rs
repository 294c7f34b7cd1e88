//! Tagged dialect (`0x51 0x78`) frames
//!
//! ```text
//! 51 78 | command | 00 | data len | 00 | data | crc8(data) | FF
//! ```

use super::bitmap::Bitmap;
use super::checksum::crc8;
use crate::{ProtocolError, Result};

pub const TAGGED_MARKER: [u8; 2] = [0x51, 0x78];
const TAGGED_HEADER: usize = 6;
const TAGGED_FOOTER: u8 = 0xFF;
/// Header, checksum and footer bytes around the data.
pub const TAGGED_OVERHEAD: usize = TAGGED_HEADER + 2;

/// Paper advanced after a tagged print.
pub const DEFAULT_FEED_LINES: u16 = 0x50;

/// Tagged dialect command bytes.
pub mod command {
    pub const FEED: u8 = 0xA1;
    pub const DRAW: u8 = 0xA2;
    pub const ENERGY: u8 = 0xAF;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFrame {
    pub command: u8,
    pub data: Vec<u8>,
}

impl TaggedFrame {
    pub fn new(command: u8, data: impl Into<Vec<u8>>) -> Self {
        Self { command, data: data.into() }
    }

    pub fn feed(lines: u16) -> Self {
        Self::new(command::FEED, lines.to_le_bytes())
    }

    /// One raster line.
    pub fn draw(line: impl Into<Vec<u8>>) -> Self {
        Self::new(command::DRAW, line)
    }

    pub fn energy(level: u16) -> Self {
        Self::new(command::ENERGY, level.to_le_bytes())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = u8::try_from(self.data.len()).map_err(|_| {
            ProtocolError::malformed_frame(format!(
                "tagged data of {} bytes does not fit an 8-bit length",
                self.data.len()
            ))
        })?;

        let mut out = Vec::with_capacity(TAGGED_OVERHEAD + self.data.len());
        out.extend_from_slice(&TAGGED_MARKER);
        out.extend_from_slice(&[self.command, 0x00, len, 0x00]);
        out.extend_from_slice(&self.data);
        out.push(crc8(&self.data));
        out.push(TAGGED_FOOTER);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(&TAGGED_MARKER) {
            return Err(ProtocolError::malformed_frame("tagged frame must start with 0x51 0x78"));
        }
        if bytes.len() < TAGGED_OVERHEAD {
            return Err(ProtocolError::malformed_frame(format!(
                "tagged frame needs at least {} bytes, found {}",
                TAGGED_OVERHEAD,
                bytes.len()
            )));
        }

        let declared = bytes[4] as usize;
        let present = bytes.len() - TAGGED_OVERHEAD;
        if declared != present {
            return Err(ProtocolError::malformed_frame(format!(
                "tagged frame declares {} data bytes, {} present",
                declared, present
            )));
        }
        if bytes[bytes.len() - 1] != TAGGED_FOOTER {
            return Err(ProtocolError::malformed_frame("tagged frame must end with 0xFF"));
        }

        let data = &bytes[TAGGED_HEADER..TAGGED_HEADER + declared];
        let expected = bytes[TAGGED_HEADER + declared];
        let actual = crc8(data);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch {
                expected: u32::from(expected),
                actual: u32::from(actual),
            });
        }

        Ok(Self { command: bytes[2], data: data.to_vec() })
    }
}

/// Frames that print `bitmap` in the tagged dialect: one energy frame, one
/// draw frame per row, then a feed of `feed_lines`.
pub fn print_sequence(bitmap: &Bitmap, energy: u16, feed_lines: u16) -> Result<Vec<TaggedFrame>> {
    if bitmap.row_bytes() > usize::from(u8::MAX) {
        return Err(ProtocolError::malformed_frame(format!(
            "rows of {} bytes do not fit a tagged draw frame",
            bitmap.row_bytes()
        )));
    }

    let mut frames = Vec::with_capacity(bitmap.height() as usize + 2);
    frames.push(TaggedFrame::energy(energy));
    frames.extend((0..bitmap.height()).filter_map(|y| bitmap.row(y)).map(TaggedFrame::draw));
    frames.push(TaggedFrame::feed(feed_lines));
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_sequence_draws_every_row_between_energy_and_feed() {
        let bitmap = Bitmap::new(16, 2, vec![0x80, 0x01, 0xFF, 0x00]).unwrap();
        let frames = print_sequence(&bitmap, 0x0001, DEFAULT_FEED_LINES).unwrap();
        let bytes: Vec<Vec<u8>> = frames.iter().map(|f| f.encode().unwrap()).collect();

        let energy_crc = crc8(&[0x01, 0x00]);
        let row0_crc = crc8(&[0x80, 0x01]);
        let row1_crc = crc8(&[0xFF, 0x00]);
        let feed_crc = crc8(&[0x50, 0x00]);
        assert_eq!(
            bytes,
            vec![
                vec![0x51, 0x78, 0xAF, 0x00, 0x02, 0x00, 0x01, 0x00, energy_crc, 0xFF],
                vec![0x51, 0x78, 0xA2, 0x00, 0x02, 0x00, 0x80, 0x01, row0_crc, 0xFF],
                vec![0x51, 0x78, 0xA2, 0x00, 0x02, 0x00, 0xFF, 0x00, row1_crc, 0xFF],
                vec![0x51, 0x78, 0xA1, 0x00, 0x02, 0x00, 0x50, 0x00, feed_crc, 0xFF],
            ]
        );
        assert_eq!((energy_crc, feed_crc), (0x15, 0x0C));
    }

    #[test]
    fn print_sequence_rejects_rows_too_wide_for_a_frame() {
        let bitmap = Bitmap::blank(2048, 1).unwrap();
        assert!(matches!(
            print_sequence(&bitmap, 1, 0),
            Err(ProtocolError::MalformedApplicationFrame { .. })
        ));
    }

    #[test]
    fn feed_layout() {
        let bytes = TaggedFrame::feed(0x0064).encode().unwrap();
        let crc = crc8(&[0x64, 0x00]);
        assert_eq!(bytes, vec![0x51, 0x78, 0xA1, 0x00, 0x02, 0x00, 0x64, 0x00, crc, 0xFF]);
    }

    #[test]
    fn round_trips() {
        for data in [vec![], vec![0x12], vec![0xFF; 48]] {
            let frame = TaggedFrame::draw(data);
            assert_eq!(TaggedFrame::decode(&frame.encode().unwrap()).unwrap(), frame);
        }
    }

    #[test]
    fn corrupted_checksum_is_detected() {
        let mut bytes = TaggedFrame::energy(0xFFFF).encode().unwrap();
        let crc_pos = bytes.len() - 2;
        bytes[crc_pos] ^= 0x01;
        assert!(matches!(
            TaggedFrame::decode(&bytes),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn framing_errors() {
        let mut bytes = TaggedFrame::feed(1).encode().unwrap();
        bytes[4] = 5;
        assert!(matches!(
            TaggedFrame::decode(&bytes),
            Err(ProtocolError::MalformedApplicationFrame { .. })
        ));
        assert!(TaggedFrame::decode(&[0x51, 0x78, 0xA1]).is_err());
        assert!(TaggedFrame::new(0xA2, vec![0u8; 300]).encode().is_err());
    }
}
