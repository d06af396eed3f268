//! Unified error type for transcodeflow.
//!
//! Submission, broker and worker failures all funnel into [`Error`], which
//! carries enough context for the HTTP layer to derive a status code via
//! [`Error::http_status`].

/// Unified error type covering all failure modes in transcodeflow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required job field was empty or absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Request data failed validation for a reason other than a missing field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {source}")]
    Serialization {
        /// The underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },

    /// The work queue backend rejected or failed an operation.
    #[error("Broker error: {0}")]
    Broker(String),

    /// An operation did not complete within its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    ///
    /// User errors are 400; everything the submitter cannot fix is 500.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::MissingField(_) => 400,
            Error::Validation(_) => 400,
            Error::Serialization { .. } => 500,
            Error::Broker(_) => 500,
            Error::Timeout(_) => 500,
            Error::Io { .. } => 500,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether the caller caused this error (and retrying unchanged is pointless).
    pub fn is_user_error(&self) -> bool {
        self.http_status() < 500
    }

    /// Convenience constructor for [`Error::Broker`].
    pub fn broker(message: impl std::fmt::Display) -> Self {
        Error::Broker(message.to_string())
    }

    /// Convenience constructor for [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
