use thiserror::Error;

pub const NOT_READY_MESSAGE: &str = "formatter is still loading";

/// Shown when a defect carries no usable message of its own.
pub const DEFECT_FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Why a single format request produced no output.
///
/// `Diagnostic` and `Defect` render the same way to the user; they stay
/// separate so callers can tell a rejected input from a broken engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("formatter is still loading")]
    NotReady,
    #[error("{0}")]
    Diagnostic(String),
    #[error("{0}")]
    Defect(String),
}

impl FormatError {
    pub fn diagnostic<S: Into<String>>(message: S) -> Self {
        FormatError::Diagnostic(message.into())
    }

    /// Blank messages are replaced by [`DEFECT_FALLBACK_MESSAGE`].
    pub fn defect<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            FormatError::Defect(DEFECT_FALLBACK_MESSAGE.to_string())
        } else {
            FormatError::Defect(message)
        }
    }
}
