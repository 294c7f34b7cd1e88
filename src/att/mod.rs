//! Attribute protocol (ATT) decoding
//!
//! Turns channel payloads routed by [`crate::hci`] into opcode, handle and
//! value units tagged with their direction. [`decode_capture`] runs the full
//! decode flow over any capture record stream.

pub mod decoder;
pub mod opcode;

pub use decoder::{AttPdu, AttributeUnit, AttributeUnits, decode_capture};
pub use opcode::AttOpcode;
