//! Human-readable names for common HCI values

/// Opcode group name.
pub fn ogf_name(ogf: u8) -> Option<&'static str> {
    Some(match ogf {
        0x01 => "Link Control",
        0x02 => "Link Policy",
        0x03 => "Controller & Baseband",
        0x04 => "Informational",
        0x05 => "Status",
        0x08 => "LE Controller",
        _ => return None,
    })
}

/// Command name for a full 16-bit opcode.
pub fn command_name(opcode: u16) -> Option<&'static str> {
    Some(match opcode {
        0x0406 => "Disconnect",
        0x0C01 => "Set Event Mask",
        0x0C03 => "Reset",
        0x1001 => "Read Local Version Information",
        0x1002 => "Read Local Supported Commands",
        0x1003 => "Read Local Supported Features",
        0x1009 => "Read BD_ADDR",
        0x2001 => "LE Set Event Mask",
        0x2002 => "LE Read Buffer Size",
        0x2003 => "LE Read Local Supported Features",
        0x2005 => "LE Set Random Address",
        0x2006 => "LE Set Advertising Parameters",
        0x2008 => "LE Set Advertising Data",
        0x200A => "LE Set Advertising Enable",
        0x200B => "LE Set Scan Parameters",
        0x200C => "LE Set Scan Enable",
        0x200D => "LE Create Connection",
        0x200E => "LE Create Connection Cancel",
        0x2010 => "LE Read Remote Features",
        0x2013 => "LE Receiver Test",
        0x2016 => "LE Read Channel Map",
        0x2018 => "LE Encrypt",
        0x201D => "LE Add Device To White List",
        0x201F => "LE Clear White List",
        0x2020 => "LE Connection Update",
        0x2024 => "LE Transmitter Test",
        0x2027 => "LE Read PHY",
        0x2032 => "LE Set PHY",
        _ => return None,
    })
}

pub fn event_name(code: u8) -> Option<&'static str> {
    Some(match code {
        0x01 => "Inquiry Complete",
        0x02 => "Inquiry Result",
        0x03 => "Connection Complete",
        0x05 => "Disconnection Complete",
        0x0E => "Command Complete",
        0x0F => "Command Status",
        0x13 => "Number Of Completed Packets",
        0x1A => "Data Buffer Overflow",
        0x3E => "LE Meta Event",
        _ => return None,
    })
}

pub fn le_subevent_name(subevent: u8) -> Option<&'static str> {
    Some(match subevent {
        0x01 => "LE Connection Complete",
        0x02 => "LE Advertising Report",
        0x03 => "LE Connection Update Complete",
        0x04 => "LE Read Remote Features Complete",
        0x05 => "LE Long Term Key Request",
        0x06 => "LE Remote Connection Parameter Request",
        0x07 => "LE Data Length Change",
        0x08 => "LE Read Local P-256 Public Key Complete",
        0x09 => "LE Generate DHKey Complete",
        0x0A => "LE Enhanced Connection Complete",
        0x0D => "LE Extended Advertising Report",
        0x12 => "LE PHY Update Complete",
        _ => return None,
    })
}

/// Name of a fixed LE data channel.
pub fn channel_name(cid: u16) -> Option<&'static str> {
    Some(match cid {
        0x0001 => "L2CAP Signaling",
        0x0004 => "ATT",
        0x0005 => "LE Signaling",
        0x0006 => "SMP",
        _ => return None,
    })
}
