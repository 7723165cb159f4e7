//! Error types for the wire protocol.

use thiserror::Error;

/// Failures decoding or interpreting a service response.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Body was not valid JSON, even after stripping the paren framing.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Envelope carried a non-success code.
    #[error("service returned code {code}: {message}")]
    Remote { code: i64, message: String },

    /// JSON decoded but did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Message reported by the service, if this is a remote failure.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ProtocolError::Remote { message, .. } => Some(message),
            _ => None,
        }
    }
}
