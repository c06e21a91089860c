use thiserror::Error;

use crate::clipboard::ClipboardError;
use crate::engine::EngineError;
use crate::formatter::FormatError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),
    #[error("Config error: {0}")]
    Config(String),
    // dispatcher / channel
    #[error("Playground error: {0}")]
    Playground(#[from] PlaygroundError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the command dispatcher itself, not of the operations it runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaygroundError {
    #[error("Command send failed: {message}")]
    SendFailed { message: String },
    #[error("Task join failed: {message}")]
    JoinFailed { message: String },
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}
