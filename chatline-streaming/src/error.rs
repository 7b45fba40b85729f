//! Streaming errors.

use chatline_core::TransportError;
use thiserror::Error;

/// Errors that can occur while reading a record stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The underlying byte stream failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A record grew past the buffer limit without a delimiter.
    #[error("Record buffer exceeded {limit} bytes")]
    BufferOverflow {
        /// The configured limit.
        limit: usize,
    },
}

impl StreamError {
    /// Collapse into the transport error surfaced to callers.
    #[must_use]
    pub fn into_transport(self) -> TransportError {
        match self {
            Self::Transport(err) => err,
            other @ Self::BufferOverflow { .. } => TransportError::read(other),
        }
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
