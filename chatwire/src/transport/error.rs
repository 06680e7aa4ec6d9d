//! Error types for transport operations.

use thiserror::Error;

/// Errors that can occur while opening or using the transport.
///
/// Foreign error details are carried as strings so variants stay `Clone`
/// and comparable across the listener and promise boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The handshake request could not be constructed. This is a
    /// caller-side error (bad credential characters, malformed URL parts)
    /// and is returned to the caller instead of feeding the retry cascade.
    #[error("invalid handshake request: {message}")]
    InvalidRequest {
        /// Details about the invalid request.
        message: String,
    },

    /// The server answered the handshake with a rejection.
    #[error("server rejected handshake: {message}")]
    Handshake {
        /// Details about the rejection.
        message: String,
    },

    /// The connection could not be established or was lost at the socket
    /// level.
    #[error("connection failed: {message}")]
    Connect {
        /// Details about the network failure.
        message: String,
    },

    /// The WebSocket protocol was violated.
    #[error("websocket protocol error: {message}")]
    Protocol {
        /// Details about the protocol violation.
        message: String,
    },

    /// The transport is already closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether this error is a construction-time request error that should
    /// be surfaced to the caller rather than retried.
    pub fn is_request_error(&self) -> bool {
        matches!(self, TransportError::InvalidRequest { .. })
    }
}
