//! Attribute protocol decoding on top of the transport demux
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use lxwire::att::decode_capture;
//! use lxwire::btsnoop::CaptureReader;
//!
//! fn writes() -> lxwire::Result<()> {
//!     for unit in decode_capture(CaptureReader::open("btsnoop_hci.log")?) {
//!         let unit = unit?;
//!         if unit.opcode.is_write() {
//!             println!("#{} handle {:?}: {:02x?}", unit.index, unit.handle, unit.value);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use super::opcode::AttOpcode;
use crate::Result;
use crate::hci::{Routed, TransportFrame, demux};
use crate::types::{CaptureRecord, Direction};
use tracing::trace;

/// A borrowed attribute protocol PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttPdu<'a> {
    pub opcode: AttOpcode,
    /// Present for handle-bearing opcodes with at least two bytes after the opcode
    pub handle: Option<u16>,
    pub value: &'a [u8],
}

impl<'a> AttPdu<'a> {
    /// Split a routed channel payload into opcode, handle and value.
    ///
    /// Returns `None` for an empty payload. A handle-bearing PDU too short to
    /// hold its handle keeps its bytes in `value` with no handle.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        let (&first, rest) = payload.split_first()?;
        let opcode = AttOpcode::from_byte(first);

        if opcode.has_handle() && rest.len() >= 2 {
            let handle = u16::from_le_bytes([rest[0], rest[1]]);
            return Some(Self { opcode, handle: Some(handle), value: &rest[2..] });
        }
        Some(Self { opcode, handle: None, value: rest })
    }
}

/// One attribute protocol exchange recovered from a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUnit {
    /// Position of the source record in the capture
    pub index: usize,
    /// Capture timestamp of the source record
    pub timestamp: u64,
    pub direction: Direction,
    /// ACL connection handle the PDU travelled on
    pub connection: u16,
    pub opcode: AttOpcode,
    pub handle: Option<u16>,
    pub value: Vec<u8>,
}

impl AttributeUnit {
    /// Decode a record if it carries attribute protocol traffic.
    pub fn from_record(index: usize, record: &CaptureRecord) -> Option<Self> {
        let TransportFrame::Acl(Routed::Att(frame)) = demux(&record.payload) else {
            return None;
        };
        let pdu = AttPdu::parse(frame.payload)?;

        Some(Self {
            index,
            timestamp: record.timestamp,
            direction: record.direction(),
            connection: frame.acl.handle,
            opcode: pdu.opcode,
            handle: pdu.handle,
            value: pdu.value.to_vec(),
        })
    }

    /// Unix milliseconds of the source record.
    pub fn unix_millis(&self) -> Option<u64> {
        self.timestamp.checked_sub(crate::types::CAPTURE_EPOCH_OFFSET_US).map(|us| us / 1000)
    }
}

/// Iterator adapter yielding the attribute units of a record stream.
pub struct AttributeUnits<I> {
    records: I,
    index: usize,
}

/// Chain a capture record stream through the transport demux and the
/// attribute decoder. Records without attribute traffic are skipped; record
/// errors are passed through.
pub fn decode_capture<I>(records: I) -> AttributeUnits<I::IntoIter>
where
    I: IntoIterator<Item = Result<CaptureRecord>>,
{
    AttributeUnits { records: records.into_iter(), index: 0 }
}

impl<I> Iterator for AttributeUnits<I>
where
    I: Iterator<Item = Result<CaptureRecord>>,
{
    type Item = Result<AttributeUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            let index = self.index;
            self.index += 1;

            if let Some(unit) = AttributeUnit::from_record(index, &record) {
                trace!(index, opcode = unit.opcode.as_byte(), handle = ?unit.handle, "ATT unit");
                return Some(Ok(unit));
            }
        }
    }
}
