use thiserror::Error;

/// Top-level error type for the `modwatch-api` crate.
///
/// Covers transport failures and structured rejections from the remote
/// executor. `modwatch-core` maps these into user-facing diagnostics; the
/// executor's human-readable message is preserved verbatim because the
/// poll-timeout classifier upstream matches on its text.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Executor ────────────────────────────────────────────────────
    /// The executor rejected the call, with its human-readable message.
    #[error("{message}")]
    Executor { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The human-readable message to surface to an operator.
    pub fn display_message(&self) -> String {
        match self {
            Self::Executor { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
