//! Transport abstraction over the WebSocket connection.
//!
//! The connection layer talks to a [`Transport`] that opens sockets and a
//! [`Socket`] that carries typed payloads and surfaces normalized
//! [`SocketEvent`]s. The production implementation is [`WsTransport`] on
//! tokio-tungstenite; tests substitute an in-memory transport through the
//! same seam.
//!
//! Payload content is opaque to this crate: the transport decides text vs.
//! binary framing and nothing above it interprets message bodies.

use async_trait::async_trait;

use crate::endpoint::Endpoint;

/// WebSocket adapter on tokio-tungstenite
pub mod ws;

/// Error types for transport operations
pub mod error;

pub use error::TransportError;
pub use ws::WsTransport;

/// Name of the request header carrying the API-key credential on every
/// connection attempt.
pub const API_KEY_HEADER: &str = "x-api-key";

/// A message payload crossing the connection boundary.
///
/// The variant is decided by the transport layer from the wire framing,
/// never guessed from the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame.
    Text(String),

    /// Binary frame.
    Binary(Vec<u8>),
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close status code (1000 for a negotiated close, 1006 for an abrupt
    /// termination).
    pub code: u16,

    /// Human-readable close reason, possibly empty.
    pub reason: String,

    /// Whether the closure was negotiated with a close frame, as opposed to
    /// an abrupt termination.
    pub clean: bool,
}

impl CloseInfo {
    /// Status code for a negotiated close.
    pub const NORMAL_CLOSURE: u16 = 1000;

    /// Status code for an abrupt termination without a close frame.
    pub const ABNORMAL_CLOSURE: u16 = 1006;

    /// An abrupt, unclean termination.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::ABNORMAL_CLOSURE,
            reason: reason.into(),
            clean: false,
        }
    }
}

/// An event produced by a live socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A payload arrived.
    Message(Payload),

    /// A transport-level error occurred. Errors do not terminate the
    /// connection by themselves; closure is reported separately.
    Error(TransportError),

    /// The connection ended. This is always the last event a socket
    /// produces.
    Closed(CloseInfo),
}

/// Factory for opening sockets to an endpoint.
///
/// Every attempt carries the API-key credential in the handshake request.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The socket type this transport produces.
    type Socket: Socket;

    /// Open a socket to the endpoint, completing the handshake.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        api_key: &str,
    ) -> Result<Self::Socket, TransportError>;
}

/// A live, bidirectional socket.
#[async_trait]
pub trait Socket: Send + 'static {
    /// Send one payload.
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError>;

    /// Wait for the next event. After [`SocketEvent::Closed`] the socket
    /// must not be polled again.
    async fn recv(&mut self) -> SocketEvent;

    /// Close the socket, initiating a clean shutdown where the protocol
    /// supports one.
    async fn close(&mut self) -> Result<(), TransportError>;
}
