//! Error types for chatline.
//!
//! The hierarchy separates failures by who has to deal with them:
//!
//! - [`TransportError`]: the network request failed to open or broke mid-stream.
//!   Fatal to the current reply, never retried by the library.
//! - [`MalformedRecordError`]: a single stream record could not be understood.
//!   Recovered locally by skipping the record.
//! - [`BackendError`]: the backend sent an explicit error record. Fatal to the
//!   current reply; the detail is kept for diagnostics only.
//!
//! [`ChatError`] is the umbrella type returned from public operations.

use std::time::Duration;
use thiserror::Error;

/// The main error type for chatline operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The request failed to open or the connection dropped.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend reported an error for this reply.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The caller cancelled the reply.
    #[error("Reply cancelled")]
    Cancelled,

    /// An operation was attempted in the wrong lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// Whether retrying the whole send might succeed.
    ///
    /// The library itself never retries; this is a hint for the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias using ChatError.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Network-level failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Could not connect.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No data arrived within the allowed time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Reading the response body failed mid-stream.
    #[error("Read error: {0}")]
    Read(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Create an HTTP status error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a read error from anything displayable.
    pub fn read<E: std::fmt::Display>(err: E) -> Self {
        Self::Read(err.to_string())
    }

    /// Get the HTTP status, if this was a status error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying might help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Connection(_) | Self::Timeout(_) | Self::Read(_) => true,
            Self::InvalidRequest(_) => false,
        }
    }
}

/// A single stream record that could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    /// The record had no `data:` line.
    #[error("Record has no data line")]
    NoData,

    /// The data line was not valid JSON.
    #[error("Invalid JSON in record: {0}")]
    InvalidJson(String),

    /// The JSON envelope had no `type` discriminator.
    #[error("Record is missing its type discriminator")]
    MissingDiscriminator,

    /// The discriminator was known but the fields did not match it.
    #[error("Invalid fields for '{kind}' record: {reason}")]
    InvalidFields {
        /// The record kind.
        kind: String,
        /// What was wrong.
        reason: String,
    },
}

/// An explicit error reported by the backend.
///
/// `Display` never includes the detail; read [`BackendError::detail`] for logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("The assistant could not complete this reply")]
pub struct BackendError {
    /// Raw detail from the backend, for diagnostics.
    pub detail: String,
}

impl BackendError {
    /// Create a new backend error.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
