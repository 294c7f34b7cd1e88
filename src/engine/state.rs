//! Print job lifecycle states

use serde::Serialize;
use std::fmt;

/// Where the engine is in the job lifecycle.
///
/// States advance in declaration order; `AwaitingChecksumAck` is skipped
/// unless configured, and `Error` can follow any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum EngineState {
    #[default]
    Idle,
    Initializing,
    Configuring,
    AwaitingLengthAck,
    StreamingData,
    AwaitingChecksumAck,
    AwaitingExecuteAck,
    AwaitingCompletionNotification,
    Acknowledged,
    Done,
    Error,
}

impl EngineState {
    pub fn name(self) -> &'static str {
        match self {
            EngineState::Idle => "Idle",
            EngineState::Initializing => "Initializing",
            EngineState::Configuring => "Configuring",
            EngineState::AwaitingLengthAck => "AwaitingLengthAck",
            EngineState::StreamingData => "StreamingData",
            EngineState::AwaitingChecksumAck => "AwaitingChecksumAck",
            EngineState::AwaitingExecuteAck => "AwaitingExecuteAck",
            EngineState::AwaitingCompletionNotification => "AwaitingCompletionNotification",
            EngineState::Acknowledged => "Acknowledged",
            EngineState::Done => "Done",
            EngineState::Error => "Error",
        }
    }

    /// Whether no job is running in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Idle | EngineState::Done | EngineState::Error)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
