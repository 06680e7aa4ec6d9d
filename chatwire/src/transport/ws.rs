//! WebSocket transport on tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{API_KEY_HEADER, CloseInfo, Payload, Socket, SocketEvent, Transport, TransportError};
use crate::endpoint::Endpoint;

/// Production transport speaking WebSocket over TCP or TLS.
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Socket = WsSocket;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        api_key: &str,
    ) -> Result<Self::Socket, TransportError> {
        let request = build_handshake_request(endpoint, api_key)?;
        let (stream, _response) = connect_async(request).await.map_err(map_ws_error)?;
        tracing::debug!(endpoint = %endpoint, "websocket handshake completed");
        Ok(WsSocket { inner: stream })
    }
}

/// Build the handshake request, attaching the API-key credential.
fn build_handshake_request(
    endpoint: &Endpoint,
    api_key: &str,
) -> Result<Request<()>, TransportError> {
    Request::builder()
        .uri(endpoint.url())
        .header("Host", endpoint.authority())
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Key", generate_key())
        .header(API_KEY_HEADER, api_key)
        .body(())
        .map_err(|err| TransportError::InvalidRequest {
            message: err.to_string(),
        })
}

fn map_ws_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        WsError::Http(response) => TransportError::Handshake {
            message: format!("status {}", response.status()),
        },
        WsError::HttpFormat(err) => TransportError::InvalidRequest {
            message: err.to_string(),
        },
        WsError::Url(err) => TransportError::InvalidRequest {
            message: err.to_string(),
        },
        WsError::Io(err) => TransportError::Connect {
            message: err.to_string(),
        },
        other => TransportError::Protocol {
            message: other.to_string(),
        },
    }
}

/// A live WebSocket connection.
pub struct WsSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for WsSocket {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        let message = match payload {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(bytes) => Message::Binary(bytes),
        };
        self.inner.send(message).await.map_err(map_ws_error)
    }

    async fn recv(&mut self) -> SocketEvent {
        loop {
            match self.inner.next().await {
                None => return SocketEvent::Closed(CloseInfo::abnormal("connection reset")),
                Some(Ok(Message::Text(text))) => {
                    return SocketEvent::Message(Payload::Text(text));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return SocketEvent::Message(Payload::Binary(bytes));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
                        None => (CloseInfo::NORMAL_CLOSURE, String::new()),
                    };
                    return SocketEvent::Closed(CloseInfo {
                        code,
                        reason,
                        clean: true,
                    });
                }
                // Control frames are handled by tungstenite; nothing to
                // surface upward.
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return SocketEvent::Closed(CloseInfo::abnormal("connection closed"));
                }
                Some(Err(err)) => return SocketEvent::Error(map_ws_error(err)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close(None).await.map_err(map_ws_error)
    }
}
