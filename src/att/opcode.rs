//! Attribute protocol opcode table

use std::fmt;

/// Attribute protocol opcode.
///
/// Values outside the table decode to [`AttOpcode::Unknown`] so they still
/// show up in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttOpcode {
    ErrorResponse,
    ExchangeMtuRequest,
    ExchangeMtuResponse,
    FindInformationRequest,
    FindInformationResponse,
    FindByTypeValueRequest,
    FindByTypeValueResponse,
    ReadByTypeRequest,
    ReadByTypeResponse,
    ReadRequest,
    ReadResponse,
    ReadBlobRequest,
    ReadBlobResponse,
    ReadMultipleRequest,
    ReadMultipleResponse,
    ReadByGroupTypeRequest,
    ReadByGroupTypeResponse,
    WriteRequest,
    WriteResponse,
    PrepareWriteRequest,
    PrepareWriteResponse,
    ExecuteWriteRequest,
    ExecuteWriteResponse,
    HandleValueNotification,
    HandleValueIndication,
    HandleValueConfirmation,
    WriteCommand,
    SignedWriteCommand,
    Unknown(u8),
}

impl AttOpcode {
    pub fn from_byte(byte: u8) -> Self {
        use AttOpcode::*;
        match byte {
            0x01 => ErrorResponse,
            0x02 => ExchangeMtuRequest,
            0x03 => ExchangeMtuResponse,
            0x04 => FindInformationRequest,
            0x05 => FindInformationResponse,
            0x06 => FindByTypeValueRequest,
            0x07 => FindByTypeValueResponse,
            0x08 => ReadByTypeRequest,
            0x09 => ReadByTypeResponse,
            0x0A => ReadRequest,
            0x0B => ReadResponse,
            0x0C => ReadBlobRequest,
            0x0D => ReadBlobResponse,
            0x0E => ReadMultipleRequest,
            0x0F => ReadMultipleResponse,
            0x10 => ReadByGroupTypeRequest,
            0x11 => ReadByGroupTypeResponse,
            0x12 => WriteRequest,
            0x13 => WriteResponse,
            0x16 => PrepareWriteRequest,
            0x17 => PrepareWriteResponse,
            0x18 => ExecuteWriteRequest,
            0x19 => ExecuteWriteResponse,
            0x1B => HandleValueNotification,
            0x1D => HandleValueIndication,
            0x1E => HandleValueConfirmation,
            0x52 => WriteCommand,
            0xD2 => SignedWriteCommand,
            other => Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        use AttOpcode::*;
        match self {
            ErrorResponse => 0x01,
            ExchangeMtuRequest => 0x02,
            ExchangeMtuResponse => 0x03,
            FindInformationRequest => 0x04,
            FindInformationResponse => 0x05,
            FindByTypeValueRequest => 0x06,
            FindByTypeValueResponse => 0x07,
            ReadByTypeRequest => 0x08,
            ReadByTypeResponse => 0x09,
            ReadRequest => 0x0A,
            ReadResponse => 0x0B,
            ReadBlobRequest => 0x0C,
            ReadBlobResponse => 0x0D,
            ReadMultipleRequest => 0x0E,
            ReadMultipleResponse => 0x0F,
            ReadByGroupTypeRequest => 0x10,
            ReadByGroupTypeResponse => 0x11,
            WriteRequest => 0x12,
            WriteResponse => 0x13,
            PrepareWriteRequest => 0x16,
            PrepareWriteResponse => 0x17,
            ExecuteWriteRequest => 0x18,
            ExecuteWriteResponse => 0x19,
            HandleValueNotification => 0x1B,
            HandleValueIndication => 0x1D,
            HandleValueConfirmation => 0x1E,
            WriteCommand => 0x52,
            SignedWriteCommand => 0xD2,
            Unknown(other) => other,
        }
    }

    /// Whether the two bytes after the opcode are an attribute handle.
    pub fn has_handle(self) -> bool {
        matches!(
            self,
            AttOpcode::WriteRequest
                | AttOpcode::WriteCommand
                | AttOpcode::HandleValueNotification
                | AttOpcode::HandleValueIndication
                | AttOpcode::ReadRequest
                | AttOpcode::ReadBlobRequest
                | AttOpcode::PrepareWriteRequest
                | AttOpcode::SignedWriteCommand
        )
    }

    /// Host-to-printer writes of an attribute value.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            AttOpcode::WriteRequest | AttOpcode::WriteCommand | AttOpcode::SignedWriteCommand
        )
    }

    /// Printer-to-host value pushes.
    pub fn is_value_push(self) -> bool {
        matches!(self, AttOpcode::HandleValueNotification | AttOpcode::HandleValueIndication)
    }

    pub fn name(self) -> &'static str {
        use AttOpcode::*;
        match self {
            ErrorResponse => "Error Response",
            ExchangeMtuRequest => "Exchange MTU Request",
            ExchangeMtuResponse => "Exchange MTU Response",
            FindInformationRequest => "Find Information Request",
            FindInformationResponse => "Find Information Response",
            FindByTypeValueRequest => "Find By Type Value Request",
            FindByTypeValueResponse => "Find By Type Value Response",
            ReadByTypeRequest => "Read By Type Request",
            ReadByTypeResponse => "Read By Type Response",
            ReadRequest => "Read Request",
            ReadResponse => "Read Response",
            ReadBlobRequest => "Read Blob Request",
            ReadBlobResponse => "Read Blob Response",
            ReadMultipleRequest => "Read Multiple Request",
            ReadMultipleResponse => "Read Multiple Response",
            ReadByGroupTypeRequest => "Read By Group Type Request",
            ReadByGroupTypeResponse => "Read By Group Type Response",
            WriteRequest => "Write Request",
            WriteResponse => "Write Response",
            PrepareWriteRequest => "Prepare Write Request",
            PrepareWriteResponse => "Prepare Write Response",
            ExecuteWriteRequest => "Execute Write Request",
            ExecuteWriteResponse => "Execute Write Response",
            HandleValueNotification => "Handle Value Notification",
            HandleValueIndication => "Handle Value Indication",
            HandleValueConfirmation => "Handle Value Confirmation",
            WriteCommand => "Write Command",
            SignedWriteCommand => "Signed Write Command",
            Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for AttOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.as_byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_consistent() {
        for byte in 0..=u8::MAX {
            let opcode = AttOpcode::from_byte(byte);
            assert_eq!(opcode.as_byte(), byte);
            if let AttOpcode::Unknown(_) = opcode {
                assert!(!opcode.has_handle());
            }
        }
    }

    #[test]
    fn handle_bearing_set() {
        let with_handle: Vec<u8> = (0..=u8::MAX)
            .filter(|b| AttOpcode::from_byte(*b).has_handle())
            .collect();
        assert_eq!(with_handle, vec![0x0A, 0x0C, 0x12, 0x16, 0x1B, 0x1D, 0x52, 0xD2]);
    }

    #[test]
    fn display_includes_the_byte() {
        assert_eq!(AttOpcode::WriteCommand.to_string(), "Write Command (0x52)");
        assert_eq!(AttOpcode::from_byte(0x99).to_string(), "Unknown (0x99)");
    }
}
