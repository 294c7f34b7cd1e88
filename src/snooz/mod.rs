//! Vendor capture container (btsnooz) decoding
//!
//! Android bug reports carry Bluetooth traffic as a compressed container
//! rather than a standard capture file. This module unwraps it:
//!
//! - [`bugreport`] finds the base64 container inside a bug report
//! - [`SnoozContainer`] validates the header and decompresses the body
//! - [`SnoozRecords`] reconstructs absolute timestamps and yields
//!   [`CaptureRecord`](crate::types::CaptureRecord)s
//! - [`SnoozContainer::write_btsnoop`] converts the whole container into a
//!   standard capture file

pub mod bugreport;
mod decoder;
pub mod format;

pub use bugreport::extract_container;
pub use decoder::{SnoozContainer, SnoozRecords};
pub use format::{SnoozHeader, SnoozPacketType, SnoozVersion};
