//! Traffic direction relative to the host

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a captured record or attribute unit.
///
/// Derived from bit 0 of the capture record flags: clear means the host sent
/// the packet to the controller, set means the controller delivered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Host to controller (phone to printer)
    Outbound,
    /// Controller to host (printer to phone)
    Inbound,
}

impl Direction {
    /// Flag bit carrying the direction in capture records.
    pub const FLAG_BIT: u32 = 0x01;

    /// Decode the direction from capture record flags.
    pub fn from_flags(flags: u32) -> Self {
        if flags & Self::FLAG_BIT == 0 { Direction::Outbound } else { Direction::Inbound }
    }

    /// Flag bits to store for this direction.
    pub fn to_flags(self) -> u32 {
        match self {
            Direction::Outbound => 0,
            Direction::Inbound => Self::FLAG_BIT,
        }
    }

    /// Short label used in reports
    pub fn label(self) -> &'static str {
        match self {
            Direction::Outbound => "TX",
            Direction::Inbound => "RX",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
