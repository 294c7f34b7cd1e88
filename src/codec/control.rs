//! Control dialect (`0x5A`) frames
//!
//! ```text
//! canonical: 5A | opcode | len (2, LE) | payload
//! legacy:    5A | opcode | payload            (fixed-size discovery opcodes)
//! ```
//!
//! Canonical encoding always carries the length. The legacy shape exists for
//! the handful of opcodes whose payload size is fixed, where the printer also
//! accepts the frame without a length field.

use crate::{ProtocolError, Result};

/// Leading marker byte of every control frame.
pub const CONTROL_MARKER: u8 = 0x5A;
const CANONICAL_HEADER: usize = 4;
const LEGACY_HEADER: usize = 2;

/// Control opcodes.
pub mod opcode {
    pub const INIT: u8 = 0x01;
    pub const STATUS: u8 = 0x02;
    pub const START_JOB: u8 = 0x04;
    pub const COMPLETION: u8 = 0x06;
    pub const SET_LENGTH: u8 = 0x0B;
    pub const EXECUTE: u8 = 0x0E;
    pub const START_RASTER: u8 = 0xA1;
    pub const SPEED: u8 = 0xA4;
    pub const DETAILED_STATUS: u8 = 0xA5;
    pub const MODE: u8 = 0xA6;
    pub const SPACING: u8 = 0xA7;
    pub const FLOW_CONTROL: u8 = 0xA8;
    pub const FEED: u8 = 0xA9;
    pub const ENERGY: u8 = 0xAF;

    pub fn name(op: u8) -> Option<&'static str> {
        Some(match op {
            INIT => "init",
            STATUS => "status",
            START_JOB => "start-job",
            COMPLETION => "completion",
            SET_LENGTH => "set-length",
            EXECUTE => "execute",
            START_RASTER => "start-raster",
            SPEED => "speed",
            DETAILED_STATUS => "detailed-status",
            MODE => "mode",
            SPACING => "spacing",
            FLOW_CONTROL => "flow-control",
            FEED => "feed",
            ENERGY => "energy",
            _ => return None,
        })
    }
}

/// Payload size of the opcodes that have a legacy fixed-shape form.
pub fn legacy_payload_len(op: u8) -> Option<usize> {
    match op {
        opcode::INIT => Some(0),
        opcode::SET_LENGTH => Some(2),
        opcode::START_JOB => Some(10),
        opcode::EXECUTE => Some(0),
        _ => None,
    }
}

/// Which of the two control shapes a frame uses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    #[default]
    Canonical,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub opcode: u8,
    pub payload: Vec<u8>,
    pub framing: Framing,
}

impl ControlFrame {
    /// A canonical frame.
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self { opcode, payload: payload.into(), framing: Framing::Canonical }
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn init() -> Self {
        Self::new(opcode::INIT, Vec::new())
    }

    pub fn execute() -> Self {
        Self::new(opcode::EXECUTE, Vec::new())
    }

    /// Announce the byte count of the upcoming stream, trailer included.
    pub fn set_length(total_len: u16) -> Self {
        Self::new(opcode::SET_LENGTH, total_len.to_le_bytes())
    }

    /// Start a raster job of `width` x `height` dots.
    pub fn start_raster(width: u16, height: u16) -> Self {
        Self::from_words(opcode::START_RASTER, &[width, height, 0])
    }

    /// Start a block job. The five-word payload only exists in legacy shape.
    pub fn start_job(block_count: u16, job_id: u16) -> Self {
        Self::from_words(opcode::START_JOB, &[block_count, job_id, 0, 0, 0])
            .with_framing(Framing::Legacy)
    }

    /// Final acknowledgment after the completion notification.
    pub fn completion_ack(block_count: u16) -> Self {
        Self::from_words(opcode::START_JOB, &[block_count, 0x0100, 0, 0, 0])
            .with_framing(Framing::Legacy)
    }

    pub fn energy(level: u16) -> Self {
        Self::from_words(opcode::ENERGY, &[level])
    }

    pub fn speed(speed: u16) -> Self {
        Self::from_words(opcode::SPEED, &[speed])
    }

    pub fn spacing(dots: u16) -> Self {
        Self::from_words(opcode::SPACING, &[dots])
    }

    pub fn feed(lines: u16) -> Self {
        Self::from_words(opcode::FEED, &[lines])
    }

    pub fn mode(mode: u16) -> Self {
        Self::from_words(opcode::MODE, &[mode])
    }

    pub fn flow_control(setting: u16) -> Self {
        Self::from_words(opcode::FLOW_CONTROL, &[setting])
    }

    /// Status query; the printer expects a single zero selector byte.
    pub fn detailed_status() -> Self {
        Self::new(opcode::DETAILED_STATUS, vec![0x00])
    }

    fn from_words(opcode: u8, words: &[u16]) -> Self {
        Self::new(opcode, words.iter().flat_map(|w| w.to_le_bytes()).collect::<Vec<_>>())
    }

    /// Payload read as little-endian 16-bit words; an odd trailing byte is ignored.
    pub fn words(&self) -> Vec<u16> {
        self.payload.chunks_exact(2).map(|w| u16::from_le_bytes([w[0], w[1]])).collect()
    }

    /// Encode in the frame's own framing.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self.framing {
            Framing::Canonical => self.encode(),
            Framing::Legacy => self.encode_legacy(),
        }
    }

    /// Canonical encoding with the 2-byte length field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = u16::try_from(self.payload.len()).map_err(|_| {
            ProtocolError::malformed_frame(format!(
                "control payload of {} bytes does not fit a 16-bit length",
                self.payload.len()
            ))
        })?;

        let mut out = Vec::with_capacity(CANONICAL_HEADER + self.payload.len());
        out.push(CONTROL_MARKER);
        out.push(self.opcode);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Legacy fixed-shape encoding, only defined for the fixed-size opcodes.
    pub fn encode_legacy(&self) -> Result<Vec<u8>> {
        match legacy_payload_len(self.opcode) {
            Some(len) if len == self.payload.len() => {
                let mut out = Vec::with_capacity(LEGACY_HEADER + len);
                out.push(CONTROL_MARKER);
                out.push(self.opcode);
                out.extend_from_slice(&self.payload);
                Ok(out)
            }
            Some(len) => Err(ProtocolError::malformed_frame(format!(
                "legacy opcode {:#04x} takes {} payload bytes, got {}",
                self.opcode,
                len,
                self.payload.len()
            ))),
            None => Err(ProtocolError::malformed_frame(format!(
                "opcode {:#04x} has no legacy fixed shape",
                self.opcode
            ))),
        }
    }

    /// Decode either shape.
    ///
    /// The canonical shape wins whenever its length field matches the bytes
    /// present, so a legacy frame whose first payload word happens to equal
    /// the remaining length decodes as canonical.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.first() != Some(&CONTROL_MARKER) {
            return Err(ProtocolError::malformed_frame("control frame must start with 0x5A"));
        }
        let Some(&op) = bytes.get(1) else {
            return Err(ProtocolError::malformed_frame("control frame has no opcode"));
        };

        if bytes.len() >= CANONICAL_HEADER {
            let declared = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
            if declared == bytes.len() - CANONICAL_HEADER {
                return Ok(Self::new(op, &bytes[CANONICAL_HEADER..]));
            }
        }

        match legacy_payload_len(op) {
            Some(len) if len == bytes.len() - LEGACY_HEADER => {
                Ok(Self::new(op, &bytes[LEGACY_HEADER..]).with_framing(Framing::Legacy))
            }
            _ if bytes.len() >= CANONICAL_HEADER => {
                let declared = u16::from_le_bytes([bytes[2], bytes[3]]);
                Err(ProtocolError::malformed_frame(format!(
                    "opcode {:#04x} declares {} payload bytes, {} present",
                    op,
                    declared,
                    bytes.len() - CANONICAL_HEADER
                )))
            }
            _ => Err(ProtocolError::malformed_frame(format!(
                "opcode {:#04x} frame of {} bytes has neither shape",
                op,
                bytes.len()
            ))),
        }
    }
}
