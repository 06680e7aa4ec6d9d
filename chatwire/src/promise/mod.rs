//! Single-assignment promises with chained continuations.
//!
//! A [`Promise`] holds the eventual result of one asynchronous operation:
//! it resolves or rejects exactly once, and every later completion attempt
//! is a contract violation surfaced as [`PromiseError`]. Consumers attach a
//! continuation chain with [`Promise::then`] or block on the outcome with
//! [`Promise::get_result`]; blocking is built on [`CountdownLatch`], which
//! the promise releases at its terminal transition.
//!
//! The chain is deliberately single-track: one continuation per promise,
//! spliced transitively when a continuation returns another promise. This
//! is not a pub/sub primitive — there is no fan-out to multiple independent
//! subscribers.
//!
//! ```
//! use chatwire::promise::Promise;
//!
//! let promise: Promise<u32, String> = Promise::new();
//! let chained = promise.then(None, None).expect("first continuation");
//! promise.resolve(7).expect("first resolution");
//! assert_eq!(chained.get_result(), Ok(7));
//! ```

/// Single-assignment promise with chained continuations
pub mod core;

/// Contract-violation errors for promise operations
pub mod error;

/// Countdown latch blocking primitive
pub mod latch;

pub use self::core::{OnReject, OnResolve, Promise};
pub use error::PromiseError;
pub use latch::CountdownLatch;
