//! Transport frame classification and channel routing
//!
//! Every capture payload starts with the HCI transport type byte. ACL data
//! frames carry a data-channel header whose channel identifier decides
//! whether the remaining bytes go to the attribute protocol decoder.
//!
//! ```text
//! ACL: 02 | handle+flags (2, LE) | data len (2, LE) | channel len (2, LE) | CID (2, LE) | payload
//! ```
//!
//! Only single-fragment frames are opened; continuation fragments are passed
//! through as-is.

use std::fmt;

/// Fixed channel identifier of the attribute protocol.
pub const ATT_CID: u16 = 0x0004;

const ACL_ROUTING_HEADER: usize = 9;
const COMMAND_HEADER: usize = 4;
const EVENT_HEADER: usize = 3;
const LE_META_EVENT: u8 = 0x3E;
const PB_CONTINUATION: u8 = 0x01;

/// HCI transport type, the first byte of every capture payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportType {
    Command,
    AclData,
    ScoData,
    Event,
    Unknown(u8),
}

impl TransportType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => TransportType::Command,
            0x02 => TransportType::AclData,
            0x03 => TransportType::ScoData,
            0x04 => TransportType::Event,
            other => TransportType::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            TransportType::Command => 0x01,
            TransportType::AclData => 0x02,
            TransportType::ScoData => 0x03,
            TransportType::Event => 0x04,
            TransportType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Command => write!(f, "command"),
            TransportType::AclData => write!(f, "acl"),
            TransportType::ScoData => write!(f, "sco"),
            TransportType::Event => write!(f, "event"),
            TransportType::Unknown(byte) => write!(f, "unknown({:#04x})", byte),
        }
    }
}

/// HCI command header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub opcode: u16,
    pub param_len: u8,
}

impl CommandHeader {
    /// Opcode group field (upper 6 bits).
    pub fn ogf(&self) -> u8 {
        (self.opcode >> 10) as u8
    }

    /// Opcode command field (lower 10 bits).
    pub fn ocf(&self) -> u16 {
        self.opcode & 0x03FF
    }
}

/// HCI event header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub code: u8,
    pub param_len: u8,
    /// Subevent code of LE meta events
    pub le_subevent: Option<u8>,
}

/// ACL data header with the packed handle and flags unpacked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclHeader {
    /// Connection handle (lower 12 bits)
    pub handle: u16,
    /// Packet boundary flag (bits 12-13)
    pub packet_boundary: u8,
    /// Broadcast flag (bits 14-15)
    pub broadcast: u8,
    pub data_len: u16,
}

impl AclHeader {
    fn parse(data: &[u8]) -> Self {
        let packed = u16::from_le_bytes([data[1], data[2]]);
        Self {
            handle: packed & 0x0FFF,
            packet_boundary: ((packed >> 12) & 0x3) as u8,
            broadcast: ((packed >> 14) & 0x3) as u8,
            data_len: u16::from_le_bytes([data[3], data[4]]),
        }
    }
}

/// Data-channel frame extracted from a single ACL fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFrame<'a> {
    pub acl: AclHeader,
    /// Channel-framing length as declared
    pub length: u16,
    pub cid: u16,
    pub payload: &'a [u8],
}

impl ChannelFrame<'_> {
    /// Whether the declared channel length matches the bytes present.
    pub fn is_complete(&self) -> bool {
        self.length as usize == self.payload.len()
    }
}

/// Routing decision for a complete ACL frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed<'a> {
    /// Attribute protocol traffic
    Att(ChannelFrame<'a>),
    /// Any other channel, left unopened
    OtherChannel(ChannelFrame<'a>),
    /// Continuation fragment of a multi-fragment frame
    Continuation { acl: AclHeader, payload: &'a [u8] },
}

/// One classified capture payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFrame<'a> {
    Command { header: CommandHeader, params: &'a [u8] },
    Event { header: EventHeader, params: &'a [u8] },
    Acl(Routed<'a>),
    Sco { payload: &'a [u8] },
    Unknown { byte: u8, payload: &'a [u8] },
    /// Too short for its transport type's header; kept so nothing is lost
    Truncated { transport: TransportType, len: usize },
    Empty,
}

impl TransportFrame<'_> {
    pub fn transport_type(&self) -> Option<TransportType> {
        match self {
            TransportFrame::Command { .. } => Some(TransportType::Command),
            TransportFrame::Event { .. } => Some(TransportType::Event),
            TransportFrame::Acl(_) => Some(TransportType::AclData),
            TransportFrame::Sco { .. } => Some(TransportType::ScoData),
            TransportFrame::Unknown { byte, .. } => Some(TransportType::Unknown(*byte)),
            TransportFrame::Truncated { transport, .. } => Some(*transport),
            TransportFrame::Empty => None,
        }
    }
}

/// Classify a capture payload and route ACL data by channel identifier.
pub fn demux(data: &[u8]) -> TransportFrame<'_> {
    let Some(&first) = data.first() else {
        return TransportFrame::Empty;
    };

    let transport = TransportType::from_byte(first);
    let truncated = TransportFrame::Truncated { transport, len: data.len() };

    match transport {
        TransportType::Command => {
            if data.len() < COMMAND_HEADER {
                return truncated;
            }
            let header = CommandHeader {
                opcode: u16::from_le_bytes([data[1], data[2]]),
                param_len: data[3],
            };
            TransportFrame::Command { header, params: &data[COMMAND_HEADER..] }
        }
        TransportType::Event => {
            if data.len() < EVENT_HEADER {
                return truncated;
            }
            let code = data[1];
            let params = &data[EVENT_HEADER..];
            let le_subevent = if code == LE_META_EVENT { params.first().copied() } else { None };
            let header = EventHeader { code, param_len: data[2], le_subevent };
            TransportFrame::Event { header, params }
        }
        TransportType::AclData => {
            if data.len() < ACL_ROUTING_HEADER {
                return truncated;
            }
            TransportFrame::Acl(route_acl(data))
        }
        TransportType::ScoData => TransportFrame::Sco { payload: &data[1..] },
        TransportType::Unknown(byte) => TransportFrame::Unknown { byte, payload: &data[1..] },
    }
}

fn route_acl(data: &[u8]) -> Routed<'_> {
    let acl = AclHeader::parse(data);
    if acl.packet_boundary == PB_CONTINUATION {
        return Routed::Continuation { acl, payload: &data[5..] };
    }

    let frame = ChannelFrame {
        acl,
        length: u16::from_le_bytes([data[5], data[6]]),
        cid: u16::from_le_bytes([data[7], data[8]]),
        payload: &data[ACL_ROUTING_HEADER..],
    };
    if frame.cid == ATT_CID { Routed::Att(frame) } else { Routed::OtherChannel(frame) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn att_frames_are_routed() {
        // handle 0x0040, PB=2 (first flushable), ATT write command on handle 0x0010
        let data = [0x02, 0x40, 0x20, 0x08, 0x00, 0x04, 0x00, 0x04, 0x00, 0x52, 0x10, 0x00, 0x5A];
        let TransportFrame::Acl(Routed::Att(frame)) = demux(&data) else {
            panic!("expected ATT routing");
        };
        assert_eq!(frame.acl.handle, 0x0040);
        assert_eq!(frame.acl.packet_boundary, 2);
        assert_eq!(frame.acl.broadcast, 0);
        assert_eq!(frame.acl.data_len, 8);
        assert_eq!(frame.payload, &[0x52, 0x10, 0x00, 0x5A]);
        assert!(frame.is_complete());
    }

    #[test]
    fn other_channels_pass_through_unopened() {
        let data = [0x02, 0x01, 0x20, 0x06, 0x00, 0x02, 0x00, 0x06, 0x00, 0x01, 0x02];
        match demux(&data) {
            TransportFrame::Acl(Routed::OtherChannel(frame)) => {
                assert_eq!(frame.cid, 0x0006);
                assert_eq!(frame.payload, &[0x01, 0x02]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn short_acl_is_tagged_truncated() {
        let data = [0x02, 0x40, 0x20, 0x04, 0x00, 0x00, 0x00, 0x04];
        assert_eq!(
            demux(&data),
            TransportFrame::Truncated { transport: TransportType::AclData, len: 8 }
        );
    }

    #[test]
    fn flags_are_unpacked_from_the_upper_bits() {
        // packed = 0xF123: handle 0x123, PB = 3, BC = 3
        let data = [0x02, 0x23, 0xF1, 0x04, 0x00, 0x00, 0x00, 0x04, 0x00];
        let TransportFrame::Acl(Routed::Att(frame)) = demux(&data) else {
            panic!("expected ATT routing");
        };
        assert_eq!(frame.acl.handle, 0x123);
        assert_eq!(frame.acl.packet_boundary, 3);
        assert_eq!(frame.acl.broadcast, 3);
    }

    #[test]
    fn continuation_fragments_are_not_opened() {
        let data = [0x02, 0x40, 0x10, 0x04, 0x00, 0x04, 0x00, 0x04, 0x00, 0x99];
        assert!(matches!(demux(&data), TransportFrame::Acl(Routed::Continuation { .. })));
    }

    #[test]
    fn commands_and_events_expose_headers() {
        // LE Set Scan Enable
        let cmd = [0x01, 0x0C, 0x20, 0x02, 0x01, 0x00];
        let TransportFrame::Command { header, params } = demux(&cmd) else {
            panic!("expected command");
        };
        assert_eq!(header.opcode, 0x200C);
        assert_eq!(header.ogf(), 0x08);
        assert_eq!(header.ocf(), 0x000C);
        assert_eq!(params, &[0x01, 0x00]);

        let evt = [0x04, 0x3E, 0x03, 0x02, 0x01, 0x00];
        let TransportFrame::Event { header, .. } = demux(&evt) else {
            panic!("expected event");
        };
        assert_eq!(header.code, 0x3E);
        assert_eq!(header.le_subevent, Some(0x02));
    }

    #[test]
    fn unknown_and_empty_payloads_are_kept() {
        assert_eq!(demux(&[]), TransportFrame::Empty);
        assert_eq!(demux(&[0x09, 0x01]).transport_type(), Some(TransportType::Unknown(0x09)));
    }
}
