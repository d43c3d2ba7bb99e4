use crate::buffer::{ConfigurationError, Intake};
use crate::sender::ConnectionError;
use std::fmt;
use thiserror::Error;

/// Lifecycle of a [`SubmissionEngine`](super::SubmissionEngine).
/// `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Started,
    Stopped,
}

impl From<Intake> for EngineState {
    fn from(intake: Intake) -> Self {
        match intake {
            Intake::Pending => EngineState::Created,
            Intake::Open => EngineState::Started,
            Intake::Closed => EngineState::Stopped,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Created => "created",
            EngineState::Started => "started",
            EngineState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid batch configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Transport connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Engine already started")]
    AlreadyStarted,
    #[error("Engine has been stopped and cannot be restarted")]
    Terminated,
    #[error("Engine is {state}, record not accepted")]
    NotAccepting { state: EngineState },
}
