//! Command transaction engine
//!
//! [`PrintEngine`] drives a [`PrintJob`] through its lifecycle:
//!
//! ```text
//! Idle -> Initializing -> Configuring -> AwaitingLengthAck -> StreamingData
//!      -> [AwaitingChecksumAck] -> AwaitingExecuteAck
//!      -> AwaitingCompletionNotification -> Acknowledged -> Done
//! ```
//!
//! Every phase writes its frames through the transfer scheduler and waits,
//! under its own timeout, for the notification carrying the same opcode.
//! Any failure moves the engine to `Error`.
//!
//! Status updates (`0x02`) nobody asked for are published as
//! [`PrinterStatus`] on their own watch channel.

#[allow(clippy::module_inception)]
mod engine;
mod correlator;
mod job;
mod notification;
mod state;
mod status;

pub use correlator::{Correlator, PendingAck};
pub use engine::{JobReport, PrintEngine};
pub use job::{JobStart, PrintJob, TaggedJob};
pub use notification::Notification;
pub use state::EngineState;
pub use status::PrinterStatus;
