//! Transport collaborator interface
//!
//! Device discovery and connection live outside this crate. A connected
//! link is handed to the engine as a [`Transport`]: a write path to the
//! printer's write characteristic and a stream of values notified on its
//! notify characteristic.

use crate::Result;
use futures::stream::BoxStream;

/// Primary GATT service of the printer.
pub const SERVICE_UUID: &str = "0000ffe6-0000-1000-8000-00805f9b34fb";
/// Write-without-response characteristic.
pub const WRITE_UUID: &str = "0000ffe1-0000-1000-8000-00805f9b34fb";
/// Notify characteristic.
pub const NOTIFY_UUID: &str = "0000ffe2-0000-1000-8000-00805f9b34fb";

/// Default maximum bytes per write (MTU 23 minus the 3-byte ATT header).
pub const DEFAULT_MAX_WRITE: usize = 20;

/// A connected link to the printer.
///
/// Implementations must accept writes up to the configured maximum write
/// size and deliver inbound notification payloads in arrival order.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Write one value to the printer.
    async fn write(&self, data: &[u8]) -> Result<()>;

    /// Subscribe to inbound notification payloads.
    ///
    /// The engine subscribes once and keeps the stream for its lifetime.
    async fn subscribe(&self) -> Result<BoxStream<'static, Vec<u8>>>;
}
