//! Vendor capture container structures
//!
//! A btsnooz container is a 9-byte uncompressed header followed by a
//! zlib-compressed stream of packed records:
//!
//! 1. **Header** (9 bytes) - version byte and the timestamp of the *last* record
//! 2. **Records** - per-record header (7 bytes in v1, 9 bytes in v2) and body
//!
//! Only the final timestamp is stored; each record carries the delta to its
//! predecessor, so absolute timestamps need two passes (see
//! [`super::SnoozRecords`]). Header integers are little-endian.

use crate::types::Direction;
use crate::{ProtocolError, Result};
use tracing::trace;

/// Size of the uncompressed container header.
pub const SNOOZ_HEADER_SIZE: usize = 9;
const V1_RECORD_HEADER_SIZE: usize = 7;
const V2_RECORD_HEADER_SIZE: usize = 9;

/// Container format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozVersion {
    /// Records carry a single length field
    V1,
    /// Records additionally carry the on-wire packet length
    V2,
}

impl SnoozVersion {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(SnoozVersion::V1),
            2 => Ok(SnoozVersion::V2),
            version => Err(ProtocolError::UnsupportedContainerVersion { version }),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            SnoozVersion::V1 => 1,
            SnoozVersion::V2 => 2,
        }
    }

    /// Size of the per-record header for this revision.
    pub const fn record_header_size(self) -> usize {
        match self {
            SnoozVersion::V1 => V1_RECORD_HEADER_SIZE,
            SnoozVersion::V2 => V2_RECORD_HEADER_SIZE,
        }
    }
}

/// Uncompressed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoozHeader {
    pub version: SnoozVersion,
    /// Unix milliseconds of the final record
    pub last_timestamp_ms: u64,
}

impl SnoozHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < SNOOZ_HEADER_SIZE {
            return Err(ProtocolError::truncated_container(
                data.len(),
                format!("header needs {} bytes, found {}", SNOOZ_HEADER_SIZE, data.len()),
            ));
        }

        let version = SnoozVersion::from_byte(data[0])?;
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&data[1..SNOOZ_HEADER_SIZE]);
        let last_timestamp_ms = u64::from_le_bytes(ts);

        trace!(version = data[0], last_timestamp_ms, "Parsed container header");
        Ok(Self { version, last_timestamp_ms })
    }

    pub fn to_bytes(&self) -> [u8; SNOOZ_HEADER_SIZE] {
        let mut out = [0u8; SNOOZ_HEADER_SIZE];
        out[0] = self.version.as_byte();
        out[1..].copy_from_slice(&self.last_timestamp_ms.to_le_bytes());
        out
    }
}

/// Packet type enumeration used inside the container.
///
/// These values come from the Bluetooth stack's internal representation, not
/// from HCI, and have to be mapped to a transport byte on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnoozPacketType {
    InboundEvent,
    InboundAcl,
    InboundSco,
    OutboundCommand,
    OutboundAcl,
    OutboundSco,
    Unknown(u8),
}

impl SnoozPacketType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x10 => SnoozPacketType::InboundEvent,
            0x11 => SnoozPacketType::InboundAcl,
            0x12 => SnoozPacketType::InboundSco,
            0x20 => SnoozPacketType::OutboundCommand,
            0x21 => SnoozPacketType::OutboundAcl,
            0x22 => SnoozPacketType::OutboundSco,
            other => SnoozPacketType::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            SnoozPacketType::InboundEvent => 0x10,
            SnoozPacketType::InboundAcl => 0x11,
            SnoozPacketType::InboundSco => 0x12,
            SnoozPacketType::OutboundCommand => 0x20,
            SnoozPacketType::OutboundAcl => 0x21,
            SnoozPacketType::OutboundSco => 0x22,
            SnoozPacketType::Unknown(other) => other,
        }
    }

    /// Inbound types set the direction flag; everything else counts as sent.
    pub fn direction(self) -> Direction {
        match self {
            SnoozPacketType::InboundEvent
            | SnoozPacketType::InboundAcl
            | SnoozPacketType::InboundSco => Direction::Inbound,
            _ => Direction::Outbound,
        }
    }

    /// Transport type byte synthesized in front of the record body.
    pub fn transport_byte(self) -> u8 {
        match self {
            SnoozPacketType::OutboundCommand => 0x01,
            SnoozPacketType::InboundAcl | SnoozPacketType::OutboundAcl => 0x02,
            SnoozPacketType::InboundSco | SnoozPacketType::OutboundSco => 0x03,
            SnoozPacketType::InboundEvent => 0x04,
            SnoozPacketType::Unknown(_) => 0x00,
        }
    }
}

/// Per-record header inside the decompressed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoozRecordHeader {
    /// Type byte plus body length
    pub length: u16,
    /// On-wire packet length (v2); equals `length` in v1
    pub packet_length: u16,
    /// Milliseconds since the previous record
    pub delta_ms: u32,
    pub packet_type: SnoozPacketType,
}

impl SnoozRecordHeader {
    /// Parse the record header starting at `offset`.
    ///
    /// Fails when the header itself, or the body it declares, runs past the
    /// end of `data`. Zero-length records are rejected because the length
    /// always counts the type byte.
    pub fn parse(version: SnoozVersion, data: &[u8], offset: usize) -> Result<Self> {
        let header_size = version.record_header_size();
        let available = data.len().saturating_sub(offset);
        if available < header_size {
            return Err(ProtocolError::truncated_container(
                offset,
                format!("record header needs {} bytes, found {}", header_size, available),
            ));
        }

        let h = &data[offset..offset + header_size];
        let length = u16::from_le_bytes([h[0], h[1]]);
        let (packet_length, rest) = match version {
            SnoozVersion::V1 => (length, &h[2..]),
            SnoozVersion::V2 => (u16::from_le_bytes([h[2], h[3]]), &h[4..]),
        };
        let delta_ms = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let packet_type = SnoozPacketType::from_byte(rest[4]);

        if length == 0 {
            return Err(ProtocolError::truncated_container(
                offset,
                "record length 0 cannot hold the type byte",
            ));
        }

        let header = Self { length, packet_length, delta_ms, packet_type };
        let needed = header.frame_len(version);
        if available < needed {
            return Err(ProtocolError::truncated_container(
                offset,
                format!("record declares {} bytes, only {} remain", needed, available),
            ));
        }

        Ok(header)
    }

    /// Bytes following the header (the type byte lives in the header).
    pub fn body_len(&self) -> usize {
        self.length as usize - 1
    }

    /// Header plus body size in the decompressed stream.
    pub fn frame_len(&self, version: SnoozVersion) -> usize {
        version.record_header_size() + self.body_len()
    }

    /// Append this header in container layout.
    pub fn write_to(&self, version: SnoozVersion, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.length.to_le_bytes());
        if version == SnoozVersion::V2 {
            out.extend_from_slice(&self.packet_length.to_le_bytes());
        }
        out.extend_from_slice(&self.delta_ms.to_le_bytes());
        out.push(self.packet_type.as_byte());
    }
}
