//! Printer application frame codec
//!
//! Attribute values written to and notified by the printer carry one of
//! three framing dialects, told apart by their leading marker:
//!
//! | Marker | Dialect | Shape |
//! |---|---|---|
//! | `5A` | [`ControlFrame`] | opcode, optional 16-bit length, payload |
//! | `55` | [`DataBlock`] | line count, block index, fixed-size payload |
//! | `51 78` | [`TaggedFrame`] | command, 8-bit length, data, CRC-8, `FF` |
//!
//! [`AppFrame::decode`] maps any byte string to exactly one variant;
//! unrecognized markers become [`AppFrame::Unknown`].
//!
//! ```rust
//! use lxwire::codec::{AppFrame, CodecConfig, ControlFrame};
//!
//! let frame = AppFrame::decode(&[0x5A, 0x01, 0x00, 0x00], &CodecConfig::default()).unwrap();
//! assert_eq!(frame, AppFrame::Control(ControlFrame::init()));
//! ```

pub mod bitmap;
pub mod block;
pub mod checksum;
pub mod control;
pub mod tagged;

pub use bitmap::Bitmap;
pub use block::{BLOCK_MARKER, BLOCK_SIZE_LINE, BLOCK_SIZE_SHORT, DataBlock};
pub use checksum::{TrailerChecksum, crc8, crc16_xmodem, crc32};
pub use control::{CONTROL_MARKER, ControlFrame, Framing, opcode};
pub use tagged::{TAGGED_MARKER, TaggedFrame, print_sequence};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decode-side codec settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Payload bytes per data block
    pub block_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { block_size: BLOCK_SIZE_SHORT }
    }
}

/// Framing dialect chosen by the leading marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    Control,
    DataBlock,
    Tagged,
    Unknown,
}

impl Dialect {
    /// Classify by marker alone. Total: every input has a dialect.
    pub fn of(bytes: &[u8]) -> Self {
        match bytes {
            [CONTROL_MARKER, ..] => Dialect::Control,
            [BLOCK_MARKER, ..] => Dialect::DataBlock,
            [0x51, 0x78, ..] => Dialect::Tagged,
            _ => Dialect::Unknown,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Control => write!(f, "control"),
            Dialect::DataBlock => write!(f, "data-block"),
            Dialect::Tagged => write!(f, "tagged"),
            Dialect::Unknown => write!(f, "unknown"),
        }
    }
}

/// One decoded application frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppFrame {
    Control(ControlFrame),
    DataBlock(DataBlock),
    Tagged(TaggedFrame),
    /// Bytes without a recognized marker, kept verbatim
    Unknown(Vec<u8>),
}

impl AppFrame {
    /// Decode by marker. Recognized markers with bad framing fail; anything
    /// else becomes [`AppFrame::Unknown`].
    pub fn decode(bytes: &[u8], config: &CodecConfig) -> Result<Self> {
        Ok(match Dialect::of(bytes) {
            Dialect::Control => AppFrame::Control(ControlFrame::decode(bytes)?),
            Dialect::DataBlock => AppFrame::DataBlock(DataBlock::decode(bytes, config.block_size)?),
            Dialect::Tagged => AppFrame::Tagged(TaggedFrame::decode(bytes)?),
            Dialect::Unknown => AppFrame::Unknown(bytes.to_vec()),
        })
    }

    pub fn encode(&self, config: &CodecConfig) -> Result<Vec<u8>> {
        match self {
            AppFrame::Control(frame) => frame.to_bytes(),
            AppFrame::DataBlock(block) => block.encode(config.block_size),
            AppFrame::Tagged(frame) => frame.encode(),
            AppFrame::Unknown(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            AppFrame::Control(_) => Dialect::Control,
            AppFrame::DataBlock(_) => Dialect::DataBlock,
            AppFrame::Tagged(_) => Dialect::Tagged,
            AppFrame::Unknown(_) => Dialect::Unknown,
        }
    }
}

impl fmt::Display for AppFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppFrame::Control(frame) => {
                let name = opcode::name(frame.opcode).unwrap_or("unknown");
                write!(f, "control {:#04x} ({}) payload {:02x?}", frame.opcode, name, frame.payload)
            }
            AppFrame::DataBlock(block) => write!(
                f,
                "block #{} lines={} payload {} bytes",
                block.index,
                block.line_count,
                block.payload.len()
            ),
            AppFrame::Tagged(frame) => {
                write!(f, "tagged {:#04x} data {:02x?}", frame.command, frame.data)
            }
            AppFrame::Unknown(bytes) => write!(f, "unknown {:02x?}", bytes),
        }
    }
}
