//! Contract-violation errors for promise operations.

use thiserror::Error;

/// Errors raised when a promise operation violates its usage contract.
///
/// These are programming errors, surfaced synchronously to the offending
/// caller. They are distinct from the rejection error a promise carries as
/// its terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PromiseError {
    /// The promise was already resolved or rejected.
    #[error("promise already completed")]
    AlreadyCompleted,

    /// A continuation was already attached; a promise supports a single
    /// downstream chain.
    #[error("promise already has a continuation attached")]
    ContinuationTaken,
}
