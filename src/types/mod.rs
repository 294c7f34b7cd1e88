//! Core types shared by the decode and transaction paths.
//!
//! - [`CaptureRecord`] is the unit flowing out of both the vendor container
//!   decoder and the standard capture reader
//! - [`Direction`] tells host-to-printer traffic apart from printer-to-host
//!   traffic, on every layer of the decode path
//!
//! ## Timestamps
//!
//! Capture records use the standard capture file convention: microseconds
//! since midnight, 1 January of year 0. [`CaptureRecord::unix_millis`] converts
//! back to Unix time.
//!
//! ```rust
//! use lxwire::types::{CaptureRecord, Direction};
//!
//! let ts = CaptureRecord::timestamp_from_unix_millis(1_000).unwrap();
//! let record = CaptureRecord::new(Direction::Inbound.to_flags(), ts, vec![0x04, 0x0E, 0x00]);
//!
//! assert_eq!(record.direction(), Direction::Inbound);
//! assert_eq!(record.unix_millis(), Some(1_000));
//! ```

mod direction;
mod record;

pub use direction::Direction;
pub use record::{CAPTURE_EPOCH_OFFSET_US, CaptureRecord};
