//! Error types for capture decoding and printer transactions.
//!
//! Every fallible operation in the crate returns [`ProtocolError`]. Variants
//! carry structured context (byte offsets on the decode path, opcodes and
//! phases on the transaction path) so callers can decide whether to retry,
//! abort or report.
//!
//! ## Error Categories
//!
//! - **Container Errors**: vendor capture container framing and compression
//! - **Capture Errors**: standard capture file header and record framing
//! - **Frame Errors**: application frame markers, lengths and checksums
//! - **Transaction Errors**: acknowledgment timeouts, rejections and aborts
//! - **Collaborator Errors**: transport and device failures reported upward
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use lxwire::ProtocolError;
//! use std::time::Duration;
//!
//! let error = ProtocolError::AckTimeout {
//!     opcode: 0x01,
//!     phase: "Initializing".to_string(),
//!     timeout: Duration::from_secs(1),
//! };
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Main error type for protocol operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("Unsupported capture container version {version} (expected 1 or 2)")]
    UnsupportedContainerVersion { version: u8 },

    #[error("No capture container found: {reason}")]
    ContainerNotFound { reason: String },

    #[error("Invalid container encoding: {details}")]
    InvalidEncoding { details: String },

    #[error("Truncated capture container at offset {offset:#x}: {details}")]
    TruncatedContainer { offset: usize, details: String },

    #[error("Invalid capture header: {details}")]
    InvalidCaptureHeader { details: String },

    #[error(
        "Truncated capture record at offset {offset:#x}: needed {needed} bytes, found {available}"
    )]
    TruncatedRecord { offset: u64, needed: usize, available: usize },

    #[error("Malformed application frame: {reason}")]
    MalformedApplicationFrame { reason: String },

    #[error("Malformed data block: expected {expected} payload bytes, found {actual}")]
    MalformedBlock { expected: usize, actual: usize },

    #[error("Checksum mismatch: expected {expected:#x}, computed {actual:#x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Unknown opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },

    #[error("No acknowledgment for opcode {opcode:#04x} during {phase} after {timeout:?}")]
    AckTimeout { opcode: u8, phase: String, timeout: Duration },

    #[error("Printer rejected opcode {opcode:#04x} with status {code:#04x}")]
    CommandRejected { opcode: u8, code: u8 },

    #[error("A request for opcode {opcode:#04x} is already outstanding")]
    RequestInFlight { opcode: u8 },

    #[error("Transaction aborted during {phase}")]
    Aborted { phase: String },

    #[error("Device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {details}")]
    Config { details: String },
}

impl ProtocolError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProtocolError::AckTimeout { .. } => true,
            ProtocolError::Transport { .. } => true,
            ProtocolError::DeviceNotFound { .. } => true,
            ProtocolError::RequestInFlight { .. } => true,
            ProtocolError::CommandRejected { .. } => false,
            ProtocolError::Aborted { .. } => false,
            ProtocolError::UnsupportedContainerVersion { .. } => false,
            ProtocolError::ContainerNotFound { .. } => false,
            ProtocolError::InvalidEncoding { .. } => false,
            ProtocolError::TruncatedContainer { .. } => false,
            ProtocolError::InvalidCaptureHeader { .. } => false,
            ProtocolError::TruncatedRecord { .. } => false,
            ProtocolError::MalformedApplicationFrame { .. } => false,
            ProtocolError::MalformedBlock { .. } => false,
            ProtocolError::ChecksumMismatch { .. } => false,
            ProtocolError::UnknownOpcode { .. } => false,
            ProtocolError::File { .. } => false,
            ProtocolError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ProtocolError::UnsupportedContainerVersion { .. } => vec![
                "Check the capture was produced by a btsnooz-capable Bluetooth stack",
                "Re-export the bug report with a supported Android version",
            ],
            ProtocolError::ContainerNotFound { .. } => vec![
                "Enable the Bluetooth HCI snoop log in developer options",
                "Generate the bug report after reproducing the print job",
            ],
            ProtocolError::InvalidEncoding { .. } | ProtocolError::TruncatedContainer { .. } => {
                vec![
                    "Check the bug report was not truncated while copying",
                    "Re-capture the traffic and export a fresh bug report",
                ]
            }
            ProtocolError::InvalidCaptureHeader { .. } | ProtocolError::TruncatedRecord { .. } => {
                vec![
                    "Verify the file is a btsnoop capture with HCI UART framing",
                    "Convert vendor containers before decoding them as captures",
                ]
            }
            ProtocolError::MalformedApplicationFrame { .. }
            | ProtocolError::MalformedBlock { .. } => vec![
                "Check the configured data block size matches the printer model",
                "Inspect the raw attribute value for a different framing dialect",
            ],
            ProtocolError::ChecksumMismatch { .. } => vec![
                "Treat the frame as corrupted on the radio link",
                "Compare against a second capture of the same job",
            ],
            ProtocolError::UnknownOpcode { .. } => {
                vec!["Record the opcode for later classification"]
            }
            ProtocolError::AckTimeout { .. } => vec![
                "Check the printer is powered and in range",
                "Increase the phase timeout in the engine configuration",
                "Retry the job from the start",
            ],
            ProtocolError::CommandRejected { .. } => vec![
                "Check paper and lid state on the printer",
                "Verify the command payload for this printer model",
            ],
            ProtocolError::RequestInFlight { .. } => {
                vec!["Wait for the outstanding request with the same opcode to resolve"]
            }
            ProtocolError::Aborted { .. } => vec!["Restart the job if the abort was unintended"],
            ProtocolError::DeviceNotFound { .. } => vec![
                "Ensure the printer is advertising",
                "Check the device identifier",
            ],
            ProtocolError::Transport { .. } => vec![
                "Reconnect to the printer",
                "Reduce the write size or widen the pacing delay",
            ],
            ProtocolError::File { .. } => {
                vec!["Check file exists and is readable", "Check file permissions"]
            }
            ProtocolError::Config { .. } => vec!["Fix the reported configuration field"],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ProtocolError::File { path, source }
    }

    /// Helper constructor for transport failures.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        ProtocolError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport failures with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ProtocolError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for malformed application frames.
    pub fn malformed_frame(reason: impl Into<String>) -> Self {
        ProtocolError::MalformedApplicationFrame { reason: reason.into() }
    }

    /// Helper constructor for truncated containers.
    pub fn truncated_container(offset: usize, details: impl Into<String>) -> Self {
        ProtocolError::TruncatedContainer { offset, details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        ProtocolError::Config { details: details.into() }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
