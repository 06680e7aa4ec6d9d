//! Resilient connection management.
//!
//! A [`Connection`] owns the transport and its reconnection lifecycle, and
//! translates transport events into [`ConnectionListener`] notifications.
//!
//! # Connection lifecycle
//!
//! ```text
//! ┌────────────┐   connect    ┌───────────┐
//! │Disconnected├─────────────►│ Connected │
//! │            │◄─────────────┤           │
//! └─────┬──────┘  disconnect  └─────┬─────┘
//!       │                          │
//!       │ open failed              │ closed (autoreconnect)
//!       ▼                          ▼
//! ┌────────────┐    backoff   ┌───────────┐
//! │   Retry    │◄─────────────┤Reconnecting│
//! │ scheduled  ├─────────────►│           │
//! └────────────┘   attempt    └───────────┘
//! ```
//!
//! While autoreconnect is enabled, closures feed a single retry cascade
//! with randomized exponential backoff; the cascade is never exhausted and
//! only [`Connection::disconnect`] halts it from outside. Two background
//! contexts stay separate: the socket task delivering live events, and the
//! retry task sleeping out backoff delays.

/// Core connection implementation with automatic reconnection
pub mod core;

/// Configuration for connection behavior
pub mod config;

/// Listener interface for connection events
pub mod listener;

pub use self::core::Connection;
pub use config::ConnectionConfig;
pub use listener::ConnectionListener;
