//! Error types for the STLI client

use thiserror::Error;

/// Result alias used throughout the crate.
pub type StliResult<T> = Result<T, StliError>;

/// Errors produced by the STLI client.
///
/// Variants fall into three groups, see [`is_state_error`](Self::is_state_error),
/// [`is_protocol_error`](Self::is_protocol_error) and
/// [`is_transport_error`](Self::is_transport_error). Any protocol error leaves
/// the session in an unknown position in the response stream; callers should
/// treat it as session-ending and [`close`](crate::StliConnection::close).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StliError {
    /// Underlying socket failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport used before `connect()` or after `close()`.
    #[error("Not connected")]
    NotConnected,

    /// Peer closed the stream.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport deadline expired.
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Operation not permitted in the current session state.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Caller-supplied value cannot be put on the wire.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic protocol violation.
    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    /// Response did not equal the expected acknowledgment.
    #[error("Unexpected response: expected \"{expected}\", got \"{actual}\"")]
    UnexpectedResponse { expected: String, actual: String },

    /// Response did not match a positional pattern.
    #[error("Response \"{actual}\" does not match pattern \"{pattern}\"")]
    PatternMismatch { pattern: String, actual: String },

    /// Negotiation reply matched neither acknowledgment shape.
    #[error("Unrecognized STLI negotiation response: \"{response}\"")]
    UnrecognizedInitResponse { response: String },

    /// Server rejected negotiation.
    #[error("STLI negotiation failed with status {status}: \"{response}\"")]
    NegotiationFailed { status: String, response: String },
}

impl StliError {
    /// Create a protocol error
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// A received line failed validation.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::ProtocolError { .. }
                | Self::UnexpectedResponse { .. }
                | Self::PatternMismatch { .. }
                | Self::UnrecognizedInitResponse { .. }
                | Self::NegotiationFailed { .. }
        )
    }

    /// The operation is forbidden in the current session state.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// The failure originated in the byte stream.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::NotConnected | Self::ConnectionClosed | Self::Timeout { .. }
        )
    }
}
