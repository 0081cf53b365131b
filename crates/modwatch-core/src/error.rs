// ── Core error types ──
//
// Operator-facing errors raised by session operations. The Display text is
// the exact notification line the orchestrator shows. Executor-layer errors
// are translated via `From<modwatch_api::Error>` with the remote message
// preserved verbatim — the poll-timeout classifier matches on its text.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Select a channel first")]
    NoActiveChannel,

    #[error("Connect the channel first")]
    NotConnected,

    #[error("Channel not found")]
    ChannelNotFound,

    #[error("Point not found or already removed")]
    PointNotFound,

    /// Operator input rejected before any remote call.
    #[error("{message}")]
    Validation { message: String },

    /// Remote executor failure, message preserved verbatim.
    #[error("{message}")]
    Executor { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<modwatch_api::Error> for CoreError {
    fn from(err: modwatch_api::Error) -> Self {
        match err {
            modwatch_api::Error::Executor { message } => Self::Executor { message },
            modwatch_api::Error::Deserialization { message, .. } => {
                Self::Internal(format!("executor response malformed: {message}"))
            }
            other => Self::Executor {
                message: other.to_string(),
            },
        }
    }
}
