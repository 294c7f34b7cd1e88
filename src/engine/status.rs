//! Printer status reports

use super::notification::Notification;
use serde::Serialize;
use std::fmt;

/// Status read from a status update (`0x02`) or a detailed status reply (`0xA5`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterStatus {
    pub opcode: u8,
    /// Battery level in percent, frame byte 2
    pub battery: u8,
    /// Non-zero error code from frame byte 4
    pub error: Option<u8>,
    pub raw: Vec<u8>,
}

impl PrinterStatus {
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            opcode: notification.opcode,
            battery: notification.body.first().copied().unwrap_or(0),
            error: notification.status().filter(|code| *code != 0),
            raw: notification.raw(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "battery {}%", self.battery)?;
        match self.error {
            Some(code) => write!(f, ", error {:#04x}", code),
            None => write!(f, ", ok"),
        }
    }
}
