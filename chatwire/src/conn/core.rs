//! Core connection implementation with automatic reconnection.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::config::ConnectionConfig;
use super::listener::ConnectionListener;
use crate::backoff::Backoff;
use crate::endpoint::{Endpoint, EndpointError};
use crate::transport::{CloseInfo, Payload, Socket, SocketEvent, Transport, TransportError};
use crate::transport::ws::WsTransport;

/// A resilient, persistent connection to a remote message server.
///
/// Created once per session with an endpoint, an API-key credential and a
/// [`ConnectionListener`]; lives for the life of the session. The endpoint
/// URL is normalized at construction (secure schemes to `wss` on port 443,
/// everything else to `ws` on port 80, explicit ports preserved) and reused
/// verbatim for every handshake attempt.
///
/// While autoreconnect is enabled, an unexpected closure starts a backoff
/// governed retry cascade that runs until a connect succeeds or
/// [`disconnect`](Self::disconnect) is called — retries are never exhausted.
/// At most one retry is scheduled at any instant.
pub struct Connection<T: Transport = WsTransport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for Connection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T: Transport> {
    transport: T,
    endpoint: Endpoint,
    api_key: String,
    listener: Arc<dyn ConnectionListener>,
    state: Mutex<ConnState>,
}

/// Mutable connection state. Retry scheduling and cancellation happen while
/// holding this lock, atomically with the `reconnecting` flag, so two retry
/// cascades can never run concurrently.
struct ConnState {
    auto_reconnect: bool,
    reconnecting: bool,
    /// A direct `connect` call is mid-attempt; further calls are no-ops
    /// until it settles.
    connecting: bool,
    connected: bool,
    backoff: Backoff,

    /// The pending scheduled reconnect task, at most one.
    retry: Option<JoinHandle<()>>,

    /// Outbound payload queue into the live socket task. Present only while
    /// attempting or holding a connection.
    outbound: Option<mpsc::UnboundedSender<Payload>>,

    /// Shutdown signal for the live socket task.
    shutdown: Option<mpsc::UnboundedSender<()>>,
}

impl Connection<WsTransport> {
    /// Create a connection over the production WebSocket transport.
    ///
    /// # Errors
    ///
    /// [`EndpointError`] when the URL cannot be parsed or has no host.
    pub fn new(
        url: &str,
        api_key: impl Into<String>,
        listener: Arc<dyn ConnectionListener>,
        config: ConnectionConfig,
    ) -> Result<Self, EndpointError> {
        Self::with_transport(WsTransport::new(), url, api_key, listener, config)
    }
}

impl<T: Transport> Connection<T> {
    /// Create a connection over a custom transport implementation.
    ///
    /// # Errors
    ///
    /// [`EndpointError`] when the URL cannot be parsed or has no host.
    pub fn with_transport(
        transport: T,
        url: &str,
        api_key: impl Into<String>,
        listener: Arc<dyn ConnectionListener>,
        config: ConnectionConfig,
    ) -> Result<Self, EndpointError> {
        let endpoint = Endpoint::parse(url)?;
        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                endpoint,
                api_key: api_key.into(),
                listener,
                state: Mutex::new(ConnState {
                    auto_reconnect: false,
                    reconnecting: false,
                    connecting: false,
                    connected: false,
                    backoff: Backoff::new(config.backoff),
                    retry: None,
                    outbound: None,
                    shutdown: None,
                }),
            }),
        })
    }

    /// Open the connection, recording the autoreconnect policy.
    ///
    /// If a reconnect cascade is already running, the pending retry is
    /// cancelled, the backoff rewinds to attempt zero and a fresh retry is
    /// scheduled immediately; returns `Ok(true)`. If already connected this
    /// is a no-op returning `Ok(false)`. Otherwise the transport is opened
    /// now: a successful open notifies the listener with
    /// `on_connect(false)`; a failed open surfaces through `on_error` and,
    /// with autoreconnect enabled, starts the retry cascade.
    ///
    /// # Errors
    ///
    /// Only construction-time request errors
    /// ([`TransportError::is_request_error`]) are returned to the caller;
    /// network-level failures are reported through the listener.
    pub async fn connect(&self, auto_reconnect: bool) -> Result<bool, TransportError> {
        {
            let mut state = self.shared.state.lock();
            state.auto_reconnect = auto_reconnect;
            if state.reconnecting {
                if let Some(pending) = state.retry.take() {
                    pending.abort();
                }
                state.backoff.reset();
                state.retry = Some(tokio::spawn(retry_task(Arc::clone(&self.shared))));
                tracing::debug!("restarted reconnect cascade with fresh backoff");
                return Ok(true);
            }
            if state.connected || state.connecting {
                tracing::debug!("connect called while already connected or attempting");
                return Ok(false);
            }
            state.connecting = true;
        }

        let attempt = self
            .shared
            .transport
            .connect(&self.shared.endpoint, &self.shared.api_key)
            .await;
        self.shared.state.lock().connecting = false;

        match attempt {
            Ok(socket) => {
                adopt_socket(&self.shared, socket);
                Ok(true)
            }
            Err(err) if err.is_request_error() => Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "initial connect attempt failed");
                self.shared.listener.on_error(&err);
                let mut state = self.shared.state.lock();
                if state.auto_reconnect && !state.reconnecting && !state.connected {
                    state.reconnecting = true;
                    state.retry = Some(tokio::spawn(retry_task(Arc::clone(&self.shared))));
                }
                Ok(false)
            }
        }
    }

    /// Close the connection and permanently halt the retry cascade.
    ///
    /// This is the only external path that stops retrying: autoreconnect is
    /// disabled, any pending scheduled retry is cancelled and the live
    /// socket (if any) is told to close. The closure is reported through
    /// `on_disconnect` once the socket has shut down.
    pub fn disconnect(&self) {
        let (retry, shutdown) = {
            let mut state = self.shared.state.lock();
            state.auto_reconnect = false;
            state.reconnecting = false;
            state.outbound = None;
            (state.retry.take(), state.shutdown.take())
        };
        if let Some(pending) = retry {
            pending.abort();
        }
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
    }

    /// Queue a payload for sending.
    ///
    /// With no live transport the payload is silently dropped (logged at
    /// debug level); callers that need delivery feedback should gate on
    /// [`is_connected`](Self::is_connected) or track acknowledgements at
    /// the protocol layer.
    pub fn send(&self, payload: Payload) {
        let state = self.shared.state.lock();
        match &state.outbound {
            Some(tx) => {
                if tx.send(payload).is_err() {
                    tracing::debug!("socket task gone, payload dropped");
                }
            }
            None => tracing::debug!("send without live transport, payload dropped"),
        }
    }

    /// Queue a text payload for sending.
    pub fn send_text(&self, text: impl Into<String>) {
        self.send(Payload::Text(text.into()));
    }

    /// Queue a binary payload for sending.
    pub fn send_binary(&self, bytes: impl Into<Vec<u8>>) {
        self.send(Payload::Binary(bytes.into()));
    }

    /// Whether the transport currently holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.shared.state.lock().connected
    }

    /// The normalized endpoint this connection targets.
    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }
}

/// Install a freshly opened socket: reset backoff, consume the
/// `reconnecting` flag, spawn the socket task and notify the listener.
fn adopt_socket<T: Transport>(shared: &Arc<Shared<T>>, socket: T::Socket) {
    let was_reconnecting;
    {
        let mut state = shared.state.lock();
        state.backoff.reset();
        was_reconnecting = std::mem::take(&mut state.reconnecting);
        state.connected = true;
        state.retry = None;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        state.outbound = Some(outbound_tx);
        state.shutdown = Some(shutdown_tx);
        tokio::spawn(socket_task(
            Arc::clone(shared),
            socket,
            outbound_rx,
            shutdown_rx,
        ));
    }
    tracing::debug!(was_reconnecting, "connection open");
    shared.listener.on_connect(was_reconnecting);
}

/// Background task owning the live socket: drains the outbound queue,
/// delivers socket events to the listener and reports the closure when the
/// socket ends. Kept separate from the retry task so reconnect scheduling
/// never blocks delivery of live socket events.
async fn socket_task<T: Transport>(
    shared: Arc<Shared<T>>,
    mut socket: T::Socket,
    mut outbound_rx: mpsc::UnboundedReceiver<Payload>,
    mut shutdown_rx: mpsc::UnboundedReceiver<()>,
) {
    let close = loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                if let Err(err) = socket.close().await {
                    tracing::debug!(error = %err, "error while closing socket");
                }
                break CloseInfo {
                    code: CloseInfo::NORMAL_CLOSURE,
                    reason: "client disconnect".to_string(),
                    clean: false,
                };
            }
            maybe_payload = outbound_rx.recv() => match maybe_payload {
                Some(payload) => {
                    if let Err(err) = socket.send(payload).await {
                        tracing::debug!(error = %err, "send failed");
                        shared.listener.on_error(&err);
                    }
                }
                None => {
                    // All outbound handles dropped: the connection was torn
                    // down without an explicit shutdown signal.
                    let _ = socket.close().await;
                    break CloseInfo {
                        code: CloseInfo::NORMAL_CLOSURE,
                        reason: "client disconnect".to_string(),
                        clean: false,
                    };
                }
            },
            event = socket.recv() => match event {
                SocketEvent::Message(payload) => shared.listener.on_message(payload),
                SocketEvent::Error(err) => shared.listener.on_error(&err),
                SocketEvent::Closed(info) => break info,
            },
        }
    };
    handle_close(&shared, close);
}

/// Translate a socket closure into the listener notification and, when
/// autoreconnect calls for it, start the retry cascade.
fn handle_close<T: Transport>(shared: &Arc<Shared<T>>, close: CloseInfo) {
    tracing::debug!(code = close.code, clean = close.clean, "connection closed");
    shared
        .listener
        .on_disconnect(close.clean, close.code, &close.reason);

    let mut state = shared.state.lock();
    state.connected = false;
    state.outbound = None;
    state.shutdown = None;
    if state.reconnecting {
        // A cascade is already running; never start a second one.
        return;
    }
    state.reconnecting = state.auto_reconnect;
    if state.reconnecting {
        state.retry = Some(tokio::spawn(retry_task(Arc::clone(shared))));
    }
}

/// The scheduled reconnect task: sleep out the backoff delay, then attempt
/// to reconnect, repeating until a connect succeeds, the cascade is
/// cancelled or the connection turns out to be open already. Only one of
/// these runs at a time; `connect` cancels and replaces it to restart the
/// cascade with fresh backoff.
async fn retry_task<T: Transport>(shared: Arc<Shared<T>>) {
    loop {
        let delay = { shared.state.lock().backoff.next_delay() };
        tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        tokio::time::sleep(delay).await;

        {
            let mut state = shared.state.lock();
            if !state.reconnecting {
                return;
            }
            if state.connected {
                state.reconnecting = false;
                return;
            }
        }

        match shared
            .transport
            .connect(&shared.endpoint, &shared.api_key)
            .await
        {
            Ok(socket) => {
                adopt_socket(&shared, socket);
                return;
            }
            Err(err) => {
                tracing::debug!(error = %err, "reconnect attempt failed");
                shared.listener.on_error(&err);
            }
        }
    }
}
