//! Capture decoding and command engine for the LX-D01 BLE thermal printer.
//!
//! lxwire speaks the printer's vendor protocol in both directions:
//!
//! - **Decode**: unwrap an Android bug report or `btsnooz` container into a
//!   standard btsnoop capture, demultiplex HCI transport frames, decode the
//!   attribute protocol and classify the printer's application frames
//! - **Encode**: frame commands and bitmaps, split them into radio-sized
//!   writes under a bounded in-flight window, and drive a print job through
//!   its acknowledgment-based lifecycle
//!
//! # Quick Start
//!
//! ## Decoding a capture
//!
//! ```rust,no_run
//! use lxwire::codec::CodecConfig;
//! use lxwire::report::CaptureReport;
//! use lxwire::snooz::SnoozContainer;
//!
//! fn main() -> lxwire::Result<()> {
//!     let container = SnoozContainer::open_bugreport("bugreport.txt")?;
//!     let records = container.into_records()?;
//!     let report = CaptureReport::from_records(records, &CodecConfig::default())?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! ## Printing
//!
//! ```rust,no_run
//! use lxwire::codec::{Bitmap, ControlFrame};
//! use lxwire::transport::Transport;
//! use lxwire::{EngineConfig, PrintEngine, PrintJob};
//! use std::sync::Arc;
//!
//! async fn print(link: Arc<dyn Transport>) -> lxwire::Result<()> {
//!     let config = EngineConfig::default();
//!     let mut engine = PrintEngine::start(link, config.clone()).await?;
//!
//!     let bitmap = Bitmap::blank(384, 80)?;
//!     let job = PrintJob::blocks(&bitmap, &config)?.configure(ControlFrame::energy(0x3000));
//!     let report = engine.print(job).await?;
//!     println!("done in {} writes", report.writes);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Decode path
pub mod att;
pub mod btsnoop;
pub mod hci;
pub mod report;
pub mod snooz;

// Encode and transaction path
pub mod codec;
pub mod config;
pub mod engine;
pub mod stream;
pub mod transfer;
pub mod transport;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use att::{AttributeUnit, decode_capture};
pub use btsnoop::{CaptureReader, CaptureWriter};
pub use codec::{AppFrame, CodecConfig};
pub use config::EngineConfig;
pub use engine::{EngineState, JobReport, PrintEngine, PrintJob, PrinterStatus, TaggedJob};
pub use report::CaptureReport;
pub use snooz::SnoozContainer;
pub use transport::Transport;
