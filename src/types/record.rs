//! Capture record type shared by the container decoder and the capture reader

use super::Direction;

/// Offset between the capture timestamp epoch (midnight, 1 January of year 0)
/// and the Unix epoch, in microseconds.
pub const CAPTURE_EPOCH_OFFSET_US: u64 = 0x00DC_DDB3_0F2F_8000;

/// One captured transport frame.
///
/// The payload starts with the transport type byte (command, ACL, SCO or
/// event). `timestamp` is expressed in microseconds since the capture epoch,
/// the convention of the standard capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Length of the packet on the wire, before any truncation by the capture
    pub original_len: u32,

    /// Capture flags (bit 0 = direction, bit 1 = command/event)
    pub flags: u32,

    /// Number of packets dropped between this record and the previous one
    pub drops: u32,

    /// Microseconds since the capture epoch
    pub timestamp: u64,

    /// Captured bytes, beginning with the transport type byte
    pub payload: Vec<u8>,
}

impl CaptureRecord {
    /// Create a record whose original length equals the captured length.
    pub fn new(flags: u32, timestamp: u64, payload: Vec<u8>) -> Self {
        Self { original_len: payload.len() as u32, flags, drops: 0, timestamp, payload }
    }

    /// Number of captured bytes.
    pub fn included_len(&self) -> u32 {
        self.payload.len() as u32
    }

    /// Whether the capture kept fewer bytes than the packet carried.
    pub fn is_truncated(&self) -> bool {
        self.included_len() < self.original_len
    }

    /// Direction decoded from the flags.
    pub fn direction(&self) -> Direction {
        Direction::from_flags(self.flags)
    }

    /// First payload byte, the transport type indicator.
    pub fn transport_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Timestamp converted to Unix milliseconds.
    ///
    /// Returns `None` for timestamps earlier than the Unix epoch.
    pub fn unix_millis(&self) -> Option<u64> {
        self.timestamp.checked_sub(CAPTURE_EPOCH_OFFSET_US).map(|us| us / 1000)
    }

    /// Convert Unix milliseconds to a capture timestamp.
    pub fn timestamp_from_unix_millis(ms: u64) -> Option<u64> {
        ms.checked_mul(1000)?.checked_add(CAPTURE_EPOCH_OFFSET_US)
    }
}
