//! Configuration for connection behavior.

use crate::backoff::BackoffConfig;

/// Configuration for a [`Connection`](crate::conn::Connection).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionConfig {
    /// Backoff parameters governing the reconnect cascade.
    pub backoff: BackoffConfig,
}

impl ConnectionConfig {
    /// Create a configuration with the given backoff parameters.
    pub fn new(backoff: BackoffConfig) -> Self {
        Self { backoff }
    }
}
