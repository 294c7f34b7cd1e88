//! Inbound control notifications
//!
//! The printer answers on its notify characteristic with control-marker
//! frames, but not always in the shape it accepts on the write side: the
//! completion notification carries its words straight after the opcode,
//! and echoes may or may not repeat the length field. Notifications are
//! therefore parsed leniently, keeping the raw bytes.

use crate::codec::{CONTROL_MARKER, opcode};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub opcode: u8,
    /// Bytes after the opcode
    pub body: Vec<u8>,
}

impl Notification {
    /// Parse a raw notification; `None` unless it starts with the control marker
    /// and carries an opcode.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        match raw {
            [CONTROL_MARKER, op, body @ ..] => Some(Self { opcode: *op, body: body.to_vec() }),
            _ => None,
        }
    }

    /// Reassemble the frame as received.
    pub fn raw(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(2 + self.body.len());
        raw.push(CONTROL_MARKER);
        raw.push(self.opcode);
        raw.extend_from_slice(&self.body);
        raw
    }

    /// Body read as little-endian 16-bit words.
    pub fn words(&self) -> Vec<u16> {
        self.body.chunks_exact(2).map(|w| u16::from_le_bytes([w[0], w[1]])).collect()
    }

    /// Status byte of a canonical echo (frame byte 4), if present.
    pub fn status(&self) -> Option<u8> {
        self.body.get(2).copied()
    }

    /// Whether this is the job completion notification.
    pub fn is_completion(&self) -> bool {
        self.opcode == opcode::COMPLETION && self.body.len() >= 4
    }

    /// Whether the notification repeats `request` byte for byte.
    pub fn mirrors(&self, request: &[u8]) -> bool {
        request.len() >= 2
            && request[0] == CONTROL_MARKER
            && request[1] == self.opcode
            && request[2..] == self.body[..]
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = opcode::name(self.opcode).unwrap_or("unknown");
        write!(f, "{:#04x} ({}) {:02x?}", self.opcode, name, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_needs_two_words() {
        let done = Notification::parse(&[0x5A, 0x06, 0x19, 0x00, 0x01, 0x00]).unwrap();
        assert!(done.is_completion());
        assert_eq!(done.words(), vec![25, 1]);

        let short = Notification::parse(&[0x5A, 0x06, 0x19, 0x00]).unwrap();
        assert!(!short.is_completion());
    }

    #[test]
    fn non_control_frames_are_not_notifications() {
        assert!(Notification::parse(&[0x55, 0x00]).is_none());
        assert!(Notification::parse(&[0x5A]).is_none());
    }

    #[test]
    fn status_and_mirroring() {
        let request = [0x5A, 0xA9, 0x02, 0x00, 0x64, 0x00];
        let echo = Notification::parse(&request).unwrap();
        assert!(echo.mirrors(&request));
        assert_eq!(echo.status(), Some(0x00));
        assert_eq!(echo.raw(), request.to_vec());

        let rejected = Notification::parse(&[0x5A, 0xA9, 0x01, 0x00, 0x95]).unwrap();
        assert!(!rejected.mirrors(&request));
        assert_eq!(rejected.status(), Some(0x95));

        let bare = Notification::parse(&[0x5A, 0x01]).unwrap();
        assert_eq!(bare.status(), None);
    }
}
