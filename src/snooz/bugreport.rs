//! Locating the capture container inside an Android bug report
//!
//! Bug reports embed the container as base64 text between two marker lines.
//! Lines in between are trimmed and concatenated before decoding.

use super::SnoozContainer;
use crate::{ProtocolError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;
use tracing::{debug, info};

/// Marker line opening the embedded container.
pub const BEGIN_MARKER: &str = "--- BEGIN:BTSNOOP_LOG_SUMMARY";
/// Marker line closing the embedded container.
pub const END_MARKER: &str = "--- END:BTSNOOP_LOG_SUMMARY";

/// Decode the base64 block between the summary markers into container bytes.
pub fn extract_container(text: &str) -> Result<Vec<u8>> {
    let mut lines = text.lines();

    if !lines.by_ref().any(|line| line.contains(BEGIN_MARKER)) {
        return Err(ProtocolError::ContainerNotFound {
            reason: format!("no '{}' marker in bug report", BEGIN_MARKER),
        });
    }
    debug!("Found capture summary begin marker");

    let mut encoded = String::new();
    let mut closed = false;
    for line in lines {
        if line.contains(END_MARKER) {
            closed = true;
            break;
        }
        encoded.push_str(line.trim());
    }

    if !closed {
        return Err(ProtocolError::ContainerNotFound {
            reason: format!("'{}' marker never closed by '{}'", BEGIN_MARKER, END_MARKER),
        });
    }

    let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|e| ProtocolError::InvalidEncoding {
        details: format!("capture summary is not valid base64: {}", e),
    })?;

    info!(encoded = encoded.len(), decoded = bytes.len(), "Extracted container from bug report");
    Ok(bytes)
}

impl SnoozContainer {
    /// Extract and decompress the container embedded in a bug report.
    pub fn from_bugreport(text: &str) -> Result<Self> {
        Self::parse(&extract_container(text)?)
    }

    /// Read a bug report file and extract its container.
    ///
    /// Bug reports mix encodings; invalid UTF-8 is replaced rather than
    /// rejected since the markers and the base64 block are plain ASCII.
    pub fn open_bugreport<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read(&path)
            .map_err(|e| ProtocolError::file_error(path.as_ref().to_path_buf(), e))?;
        Self::from_bugreport(&String::from_utf8_lossy(&raw))
    }
}
