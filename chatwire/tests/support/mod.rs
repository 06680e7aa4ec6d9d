//! Shared test support: a scripted in-memory transport and a recording
//! listener.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use chatwire::{
    CloseInfo, ConnectionListener, Endpoint, Payload, Socket, SocketEvent, Transport,
    TransportError,
};

/// Outcome of one scripted connect attempt. Attempts beyond the script fail.
#[derive(Debug, Clone, Copy)]
pub enum ConnectOutcome {
    Succeed,
    Fail,
}

/// In-memory transport following a script of connect outcomes.
///
/// Every successful connect hands the test a [`SessionHandle`] for driving
/// the socket from the "server" side.
#[derive(Clone)]
pub struct FakeTransport {
    inner: Arc<FakeInner>,
}

struct FakeInner {
    plan: Mutex<VecDeque<ConnectOutcome>>,
    attempts: AtomicUsize,
    sessions: mpsc::UnboundedSender<SessionHandle>,
}

impl FakeTransport {
    pub fn new(plan: Vec<ConnectOutcome>) -> (Self, mpsc::UnboundedReceiver<SessionHandle>) {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        let transport = Self {
            inner: Arc::new(FakeInner {
                plan: Mutex::new(plan.into()),
                attempts: AtomicUsize::new(0),
                sessions: sessions_tx,
            }),
        };
        (transport, sessions_rx)
    }

    /// Total connect attempts observed so far.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Socket = FakeSocket;

    async fn connect(
        &self,
        _endpoint: &Endpoint,
        _api_key: &str,
    ) -> Result<Self::Socket, TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .inner
            .plan
            .lock()
            .pop_front()
            .unwrap_or(ConnectOutcome::Fail);
        match outcome {
            ConnectOutcome::Fail => Err(TransportError::Connect {
                message: "scripted failure".to_string(),
            }),
            ConnectOutcome::Succeed => {
                let (events_tx, events_rx) = mpsc::unbounded_channel();
                let (sent_tx, sent_rx) = mpsc::unbounded_channel();
                let _ = self.inner.sessions.send(SessionHandle {
                    events: events_tx,
                    sent: sent_rx,
                });
                Ok(FakeSocket {
                    events: events_rx,
                    sent: sent_tx,
                })
            }
        }
    }
}

/// Server-side handle to one fake socket.
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SocketEvent>,
    /// Payloads the client sent on this socket.
    pub sent: mpsc::UnboundedReceiver<Payload>,
}

impl SessionHandle {
    /// Deliver a text message to the client.
    pub fn push_text(&self, text: &str) {
        let _ = self
            .events
            .send(SocketEvent::Message(Payload::Text(text.to_string())));
    }

    /// Deliver a transport error to the client.
    pub fn push_error(&self, message: &str) {
        let _ = self.events.send(SocketEvent::Error(TransportError::Protocol {
            message: message.to_string(),
        }));
    }

    /// Close the socket from the server side.
    pub fn close(&self, code: u16, reason: &str, clean: bool) {
        let _ = self.events.send(SocketEvent::Closed(CloseInfo {
            code,
            reason: reason.to_string(),
            clean,
        }));
    }
}

/// Client-side fake socket driven by a [`SessionHandle`].
pub struct FakeSocket {
    events: mpsc::UnboundedReceiver<SocketEvent>,
    sent: mpsc::UnboundedSender<Payload>,
}

#[async_trait]
impl Socket for FakeSocket {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        self.sent.send(payload).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> SocketEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => SocketEvent::Closed(CloseInfo::abnormal("session handle dropped")),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.events.close();
        Ok(())
    }
}

/// One listener notification, recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Connect {
        was_reconnecting: bool,
    },
    Message(Payload),
    Disconnect {
        server_initiated: bool,
        code: u16,
        reason: String,
    },
    Error(String),
}

/// Listener that forwards every notification into a channel.
pub struct RecordingListener {
    tx: mpsc::UnboundedSender<ListenerEvent>,
}

pub fn recording_listener() -> (Arc<RecordingListener>, mpsc::UnboundedReceiver<ListenerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingListener { tx }), rx)
}

impl ConnectionListener for RecordingListener {
    fn on_connect(&self, was_reconnecting: bool) {
        let _ = self.tx.send(ListenerEvent::Connect { was_reconnecting });
    }

    fn on_message(&self, payload: Payload) {
        let _ = self.tx.send(ListenerEvent::Message(payload));
    }

    fn on_disconnect(&self, server_initiated: bool, code: u16, reason: &str) {
        let _ = self.tx.send(ListenerEvent::Disconnect {
            server_initiated,
            code,
            reason: reason.to_string(),
        });
    }

    fn on_error(&self, error: &TransportError) {
        let _ = self.tx.send(ListenerEvent::Error(error.to_string()));
    }
}

/// Wait for the next listener event, failing the test after five seconds.
pub async fn expect_event(rx: &mut mpsc::UnboundedReceiver<ListenerEvent>) -> ListenerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for listener event")
        .expect("listener channel closed")
}

/// Like [`expect_event`], but skipping transport errors from failed retry
/// attempts.
pub async fn expect_event_skipping_errors(
    rx: &mut mpsc::UnboundedReceiver<ListenerEvent>,
) -> ListenerEvent {
    loop {
        match expect_event(rx).await {
            ListenerEvent::Error(_) => continue,
            other => return other,
        }
    }
}

/// Initialize test logging once; filter via `RUST_LOG`.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
