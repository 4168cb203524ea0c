//! Remote call error types

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the remote call machinery itself.
///
/// Tool-side failures travel in-band as [`crate::protocol::AgentError`]
/// payloads; this type only covers the channel: serialization, I/O and
/// protocol faults.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol version mismatch
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u32, actual: u32 },

    /// Response correlation id does not match the request
    #[error("Correlation mismatch: expected {expected}, got {actual}")]
    CorrelationMismatch { expected: Uuid, actual: Uuid },
}

impl RemoteError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::IoError(_) | RemoteError::ConnectionClosed)
    }

    /// Check if this error indicates a fatal protocol condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RemoteError::ProtocolVersionMismatch { .. } | RemoteError::CorrelationMismatch { .. }
        )
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        RemoteError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            RemoteError::IoError(err.to_string())
        } else if err.is_data() {
            RemoteError::DeserializationError(err.to_string())
        } else {
            RemoteError::SerializationError(err.to_string())
        }
    }
}
