//! # Chatwire
//!
//! Resilient client connection to a remote message server, paired with a
//! chainable single-assignment promise for delivering asynchronous results.
//!
//! This crate provides:
//! - **Connection**: a persistent WebSocket client with automatic,
//!   backoff-governed reconnection and a listener interface for
//!   connect/message/disconnect/error events
//! - **Promise**: a single-assignment result container with chained
//!   continuations and blocking waits, built on a countdown latch
//! - **Backoff**: half-jitter exponential backoff for retry scheduling
//!
//! Message payloads are opaque: the crate moves text and binary frames
//! across the connection boundary and never interprets their content.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chatwire::{Connection, ConnectionConfig, ConnectionListener, Payload, TransportError};
//!
//! struct Printer;
//!
//! impl ConnectionListener for Printer {
//!     fn on_connect(&self, was_reconnecting: bool) {
//!         println!("connected (reconnect: {was_reconnecting})");
//!     }
//!     fn on_message(&self, payload: Payload) {
//!         println!("message: {payload:?}");
//!     }
//!     fn on_disconnect(&self, server_initiated: bool, code: u16, reason: &str) {
//!         println!("closed: {code} {reason} (server: {server_initiated})");
//!     }
//!     fn on_error(&self, error: &TransportError) {
//!         eprintln!("transport error: {error}");
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = Connection::new(
//!     "wss://chat.example.com/socket",
//!     "my-api-key",
//!     Arc::new(Printer),
//!     ConnectionConfig::default(),
//! )?;
//! connection.connect(true).await?;
//! connection.send_text("hello");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Half-jitter exponential backoff for reconnect scheduling.
pub mod backoff;

/// Resilient connection management.
pub mod conn;

/// Server endpoint parsing and normalization.
pub mod endpoint;

/// Single-assignment promises with chained continuations.
pub mod promise;

/// Transport abstraction and the WebSocket implementation.
pub mod transport;

// =============================================================================
// Public API Re-exports
// =============================================================================

// Backoff exports
pub use backoff::{Backoff, BackoffConfig};

// Connection exports
pub use conn::{Connection, ConnectionConfig, ConnectionListener};

// Endpoint exports
pub use endpoint::{Endpoint, EndpointError};

// Promise exports
pub use promise::{CountdownLatch, Promise, PromiseError};

// Transport exports
pub use transport::{
    API_KEY_HEADER, CloseInfo, Payload, Socket, SocketEvent, Transport, TransportError,
    WsTransport,
};
