//! Half-jitter exponential backoff for reconnect scheduling.
//!
//! Each attempt doubles the delay window up to a shift cap, and the actual
//! delay is drawn uniformly from the upper half of the window. Growth keeps
//! retries from hammering a struggling server; jitter keeps a fleet of
//! clients from reconnecting in lockstep after a shared outage.

use std::time::Duration;

use rand::Rng;

/// Configuration for [`Backoff`].
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Delay floor for the first attempt.
    pub base_delay: Duration,

    /// Cap on the doubling exponent; attempts beyond this reuse the
    /// capped window.
    pub max_shift: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_shift: 11,
        }
    }
}

/// Randomized exponential backoff counter.
///
/// `next_delay` for attempt `a` returns a duration uniformly distributed in
/// `[base << a, base << (a + 1))`, with `a` clamped at
/// [`BackoffConfig::max_shift`]. [`reset`](Self::reset) rewinds to attempt
/// zero after a successful connect.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff counter at attempt zero.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Compute the delay for the current attempt and advance the counter.
    pub fn next_delay(&mut self) -> Duration {
        let shift = self.attempt.min(self.config.max_shift);
        self.attempt = self.attempt.saturating_add(1);

        let half_ms = (self.config.base_delay.as_millis() as u64) << shift;
        if half_ms == 0 {
            return Duration::ZERO;
        }
        let delay_ms = rand::thread_rng().gen_range(half_ms..half_ms * 2);
        Duration::from_millis(delay_ms)
    }

    /// Rewind to attempt zero.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
