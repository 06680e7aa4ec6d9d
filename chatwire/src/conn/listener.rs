//! Listener interface for connection lifecycle and message events.

use crate::transport::{Payload, TransportError};

/// Callbacks for connection events, implemented by the layer above.
///
/// Callbacks are invoked from the connection's background tasks, never while
/// the connection's internal lock is held, so an implementation may call
/// back into [`Connection`](crate::conn::Connection) methods freely. They
/// should still return promptly: a slow callback delays delivery of
/// subsequent socket events.
pub trait ConnectionListener: Send + Sync + 'static {
    /// The transport opened. `was_reconnecting` is `true` when this connect
    /// ends a reconnect cascade rather than answering a direct
    /// [`connect`](crate::conn::Connection::connect) call.
    fn on_connect(&self, was_reconnecting: bool);

    /// A payload arrived.
    fn on_message(&self, payload: Payload);

    /// The transport closed. `server_initiated` reflects whether the
    /// closure was negotiated by the remote end with a close frame.
    fn on_disconnect(&self, server_initiated: bool, code: u16, reason: &str);

    /// A transport-level error occurred. Errors do not terminate the
    /// connection by themselves; a closure, if one follows, is reported via
    /// [`on_disconnect`](Self::on_disconnect).
    fn on_error(&self, error: &TransportError);
}
