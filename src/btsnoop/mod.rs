//! Standard capture file (btsnoop) reading and writing
//!
//! This module parses the standard Bluetooth capture format into a lazy
//! sequence of [`CaptureRecord`](crate::types::CaptureRecord)s and writes
//! record streams back out in the same format.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{CaptureFileHeader, RecordHeader};
pub use reader::CaptureReader;
pub use writer::CaptureWriter;
