//! Engine configuration
//!
//! Every field has a default matching the printer's observed behavior, so an
//! empty YAML document yields a working configuration:
//!
//! ```rust
//! use lxwire::EngineConfig;
//!
//! let config = EngineConfig::from_yaml_str("window: 3\ntimeouts:\n  execute_ms: 5000\n").unwrap();
//! assert_eq!(config.window, 3);
//! assert_eq!(config.max_write, 20);
//! assert_eq!(config.timeouts.execute_ms, 5000);
//! ```

use crate::codec::{BLOCK_SIZE_LINE, BLOCK_SIZE_SHORT, CodecConfig, Framing};
use crate::codec::block::BLOCK_HEADER_SIZE;
use crate::engine::EngineState;
use crate::transfer::{Admission, PacedAdmission};
use crate::transport::DEFAULT_MAX_WRITE;
use crate::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Settings for the transaction engine and its transfer scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest single transport write in bytes
    pub max_write: usize,
    /// Writes allowed in flight at once
    pub window: usize,
    /// Delay before a paced credit returns
    pub pacing_ms: u64,
    /// Payload bytes per data block
    pub block_size: usize,
    /// Line count carried in every data block header
    pub lines_per_block: u8,
    /// Shape used for the fixed-size control frames
    pub framing: Framing,
    pub timeouts: PhaseTimeouts,
    /// Wait for an echo of the start opcode after the trailer checksum
    pub await_checksum_ack: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_write: DEFAULT_MAX_WRITE,
            window: 2,
            pacing_ms: 10,
            block_size: BLOCK_SIZE_SHORT,
            lines_per_block: 0,
            framing: Framing::Canonical,
            timeouts: PhaseTimeouts::default(),
            await_checksum_ack: false,
        }
    }
}

/// Per-phase acknowledgment timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTimeouts {
    pub init_ms: u64,
    pub configure_ms: u64,
    pub length_ms: u64,
    pub checksum_ms: u64,
    pub execute_ms: u64,
    pub completion_ms: u64,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            init_ms: 1_000,
            configure_ms: 1_000,
            length_ms: 2_000,
            checksum_ms: 2_000,
            execute_ms: 10_000,
            completion_ms: 10_000,
        }
    }
}

impl PhaseTimeouts {
    /// Timeout of the wait performed in `state`.
    ///
    /// States that never wait for the printer fall back to the configure timeout.
    pub fn for_state(&self, state: EngineState) -> Duration {
        let ms = match state {
            EngineState::Initializing => self.init_ms,
            EngineState::AwaitingLengthAck => self.length_ms,
            EngineState::AwaitingChecksumAck => self.checksum_ms,
            EngineState::AwaitingExecuteAck => self.execute_ms,
            EngineState::AwaitingCompletionNotification => self.completion_ms,
            _ => self.configure_ms,
        };
        Duration::from_millis(ms)
    }

    fn all(&self) -> [(&'static str, u64); 6] {
        [
            ("init_ms", self.init_ms),
            ("configure_ms", self.configure_ms),
            ("length_ms", self.length_ms),
            ("checksum_ms", self.checksum_ms),
            ("execute_ms", self.execute_ms),
            ("completion_ms", self.completion_ms),
        ]
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ProtocolError::config_error(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!(path = %path.display(), ?config, "Loaded engine configuration");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| ProtocolError::config_error(format!("cannot serialize: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(ProtocolError::config_error("window must be at least 1"));
        }
        if self.max_write == 0 {
            return Err(ProtocolError::config_error("max_write must be at least 1"));
        }
        if self.block_size == 0 {
            return Err(ProtocolError::config_error("block_size must be non-zero"));
        }
        let standard = matches!(self.block_size, BLOCK_SIZE_SHORT | BLOCK_SIZE_LINE);
        if !standard && self.block_size + BLOCK_HEADER_SIZE > self.max_write {
            return Err(ProtocolError::config_error(format!(
                "block_size {} is non-standard and its {}-byte frame exceeds max_write {}",
                self.block_size,
                self.block_size + BLOCK_HEADER_SIZE,
                self.max_write
            )));
        }
        if let Some((name, _)) = self.timeouts.all().into_iter().find(|(_, ms)| *ms == 0) {
            return Err(ProtocolError::config_error(format!("timeouts.{} must be non-zero", name)));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn codec(&self) -> CodecConfig {
        CodecConfig { block_size: self.block_size }
    }

    /// Paced admission sized from this configuration.
    pub fn admission(&self) -> Arc<dyn Admission> {
        Arc::new(PacedAdmission::new(self.window, self.pacing()))
    }
}
