//! Single-assignment promise with chained continuations and blocking waits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::error::PromiseError;
use super::latch::CountdownLatch;

/// Success continuation. Returning `None` forwards the value to the
/// downstream promise unchanged; returning `Some(promise)` splices that
/// promise's eventual resolution into the chain.
pub type OnResolve<T, E> = Box<dyn FnOnce(T) -> Option<Promise<T, E>> + Send>;

/// Failure continuation. Returning `None` forwards the error to the
/// downstream promise unchanged; returning `Some(promise)` splices that
/// promise's eventual resolution into the chain.
pub type OnReject<T, E> = Box<dyn FnOnce(E) -> Option<Promise<T, E>> + Send>;

enum State<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
}

struct Inner<T, E> {
    state: State<T, E>,
    on_resolve: Option<OnResolve<T, E>>,
    on_reject: Option<OnReject<T, E>>,
    downstream: Option<Promise<T, E>>,
}

struct PromiseShared<T, E> {
    inner: Mutex<Inner<T, E>>,
    latch: CountdownLatch,
    created_at: Instant,
}

/// A single-assignment container for an asynchronous result or error.
///
/// A promise starts pending and transitions exactly once to resolved or
/// rejected; any further completion attempt fails with
/// [`PromiseError::AlreadyCompleted`]. Consumers either attach continuations
/// with [`then`](Self::then) (and the [`on_resolved`](Self::on_resolved) /
/// [`on_rejected`](Self::on_rejected) / [`finally`](Self::finally) wrappers)
/// or block on the terminal state with [`get_result`](Self::get_result) /
/// [`wait_result`](Self::wait_result).
///
/// Cloning yields another handle to the same promise, so a producer can keep
/// one handle and hand the other to the consumer.
///
/// # Single chain
///
/// Each promise supports exactly one downstream continuation: `then` may be
/// called once, and a second call fails with
/// [`PromiseError::ContinuationTaken`]. This is a deliberate design choice,
/// not a limitation to work around — fan-out to independent subscribers is
/// out of scope.
///
/// # Preconditions
///
/// Chains must be acyclic. A continuation that returns a promise
/// participating in its own ancestry will deadlock; this is not detected.
/// Blocking on a promise that is never completed blocks forever.
pub struct Promise<T, E> {
    shared: Arc<PromiseShared<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> std::fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn with_state(state: State<T, E>, latch_count: usize) -> Self {
        Self {
            shared: Arc::new(PromiseShared {
                inner: Mutex::new(Inner {
                    state,
                    on_resolve: None,
                    on_reject: None,
                    downstream: None,
                }),
                latch: CountdownLatch::new(latch_count),
                created_at: Instant::now(),
            }),
        }
    }

    /// Create a pending promise.
    pub fn new() -> Self {
        Self::with_state(State::Pending, 1)
    }

    /// Create a promise already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        Self::with_state(State::Resolved(value), 0)
    }

    /// Create a promise already rejected with `error`.
    pub fn rejected(error: E) -> Self {
        Self::with_state(State::Rejected(error), 0)
    }

    /// Resolve the promise with `value`.
    ///
    /// The success continuation (if any) runs synchronously on the calling
    /// thread, under the promise's lock, before the latch is released. With
    /// no continuation attached the value is forwarded to the downstream
    /// promise.
    ///
    /// # Errors
    ///
    /// [`PromiseError::AlreadyCompleted`] if the promise is no longer
    /// pending.
    pub fn resolve(&self, value: T) -> Result<(), PromiseError> {
        let mut inner = self.shared.inner.lock();
        if !matches!(inner.state, State::Pending) {
            return Err(PromiseError::AlreadyCompleted);
        }
        inner.state = State::Resolved(value.clone());
        let handler = inner.on_resolve.take();
        let downstream = inner.downstream.clone();
        run_success(value, handler, downstream);
        drop(inner);
        self.shared.latch.count_down();
        Ok(())
    }

    /// Reject the promise with `error`.
    ///
    /// The failure continuation (if any) runs synchronously under the
    /// promise's lock. With no continuation the error is forwarded verbatim
    /// to the downstream promise; with no downstream either, the dropped
    /// rejection is logged and left for a blocked
    /// [`get_result`](Self::get_result) caller to observe.
    ///
    /// # Errors
    ///
    /// [`PromiseError::AlreadyCompleted`] if the promise is no longer
    /// pending.
    pub fn reject(&self, error: E) -> Result<(), PromiseError> {
        let mut inner = self.shared.inner.lock();
        if !matches!(inner.state, State::Pending) {
            return Err(PromiseError::AlreadyCompleted);
        }
        inner.state = State::Rejected(error.clone());
        let handler = inner.on_reject.take();
        let downstream = inner.downstream.clone();
        run_failure(error, handler, downstream, self.shared.created_at.elapsed());
        drop(inner);
        self.shared.latch.count_down();
        Ok(())
    }

    /// Attach continuations and return the downstream promise.
    ///
    /// Either handler may be `None`; a missing handler forwards the
    /// value/error to the downstream promise unchanged. If this promise is
    /// already terminal the relevant handler runs immediately, on the
    /// calling thread.
    ///
    /// # Errors
    ///
    /// [`PromiseError::ContinuationTaken`] if a downstream promise already
    /// exists.
    pub fn then(
        &self,
        on_resolve: Option<OnResolve<T, E>>,
        on_reject: Option<OnReject<T, E>>,
    ) -> Result<Promise<T, E>, PromiseError> {
        let mut inner = self.shared.inner.lock();
        if inner.downstream.is_some() {
            return Err(PromiseError::ContinuationTaken);
        }
        let downstream = Promise::new();
        inner.downstream = Some(downstream.clone());

        let terminal = match &inner.state {
            State::Pending => None,
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
        };
        match terminal {
            None => {
                inner.on_resolve = on_resolve;
                inner.on_reject = on_reject;
            }
            Some(Ok(value)) => run_success(value, on_resolve, Some(downstream.clone())),
            Some(Err(error)) => run_failure(
                error,
                on_reject,
                Some(downstream.clone()),
                self.shared.created_at.elapsed(),
            ),
        }
        Ok(downstream)
    }

    /// Attach a success-only continuation.
    ///
    /// # Errors
    ///
    /// See [`then`](Self::then).
    pub fn on_resolved<F>(&self, f: F) -> Result<Promise<T, E>, PromiseError>
    where
        F: FnOnce(T) -> Option<Promise<T, E>> + Send + 'static,
    {
        self.then(Some(Box::new(f)), None)
    }

    /// Attach a failure-only continuation.
    ///
    /// # Errors
    ///
    /// See [`then`](Self::then).
    pub fn on_rejected<F>(&self, f: F) -> Result<Promise<T, E>, PromiseError>
    where
        F: FnOnce(E) -> Option<Promise<T, E>> + Send + 'static,
    {
        self.then(None, Some(Box::new(f)))
    }

    /// Attach a continuation invoked on both paths, with no access to the
    /// value or error. The outcome is forwarded downstream unchanged.
    ///
    /// # Errors
    ///
    /// See [`then`](Self::then).
    pub fn finally<F>(&self, f: F) -> Result<Promise<T, E>, PromiseError>
    where
        F: FnOnce() + Send + 'static,
    {
        let f = Arc::new(Mutex::new(Some(f)));
        let on_resolve = {
            let f = Arc::clone(&f);
            Box::new(move |_value: T| {
                if let Some(f) = f.lock().take() {
                    f();
                }
                None
            }) as OnResolve<T, E>
        };
        let on_reject = Box::new(move |_error: E| {
            if let Some(f) = f.lock().take() {
                f();
            }
            None
        }) as OnReject<T, E>;
        self.then(Some(on_resolve), Some(on_reject))
    }

    /// Block until the promise is terminal, then return the value or error.
    ///
    /// Blocks forever on a promise that is never completed; guarding against
    /// that is the caller's responsibility.
    pub fn get_result(&self) -> Result<T, E> {
        self.shared.latch.wait();
        let inner = self.shared.inner.lock();
        match &inner.state {
            State::Resolved(value) => Ok(value.clone()),
            State::Rejected(error) => Err(error.clone()),
            State::Pending => unreachable!("latch released while promise still pending"),
        }
    }

    /// Block until the promise is terminal; `true` if it resolved.
    pub fn wait_result(&self) -> bool {
        self.shared.latch.wait();
        matches!(self.shared.inner.lock().state, State::Resolved(_))
    }

    /// Whether the promise has reached a terminal state.
    pub fn is_completed(&self) -> bool {
        !matches!(self.shared.inner.lock().state, State::Pending)
    }

    /// Time elapsed since the promise was created.
    pub fn age(&self) -> Duration {
        self.shared.created_at.elapsed()
    }

    /// Mirror this promise's eventual resolution onto `downstream`.
    ///
    /// Used for chain splicing when a continuation returns another promise.
    /// If this promise is already terminal the outcome propagates
    /// immediately; otherwise `downstream` becomes this promise's downstream
    /// link. A promise whose downstream slot is already taken cannot adopt
    /// another; the splice is dropped with a warning and `downstream` stays
    /// pending.
    fn adopt(&self, downstream: Promise<T, E>) {
        let mut inner = self.shared.inner.lock();
        let terminal = match &inner.state {
            State::Pending => None,
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
        };
        match terminal {
            None => {
                if inner.downstream.is_some() {
                    tracing::warn!(
                        "spliced promise already has a continuation; downstream stays pending"
                    );
                } else {
                    inner.downstream = Some(downstream);
                }
            }
            Some(Ok(value)) => {
                drop(inner);
                let _ = downstream.resolve(value);
            }
            Some(Err(error)) => {
                drop(inner);
                let _ = downstream.reject(error);
            }
        }
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Run the success path: invoke the handler (or forward the value) and wire
/// any returned promise into the chain.
fn run_success<T, E>(value: T, handler: Option<OnResolve<T, E>>, downstream: Option<Promise<T, E>>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    match handler {
        None => {
            if let Some(next) = downstream {
                let _ = next.resolve(value);
            }
        }
        Some(handler) => match handler(value.clone()) {
            None => {
                if let Some(next) = downstream {
                    let _ = next.resolve(value);
                }
            }
            Some(returned) => {
                if let Some(next) = downstream {
                    returned.adopt(next);
                }
            }
        },
    }
}

/// Run the failure path: invoke the handler, or forward the error verbatim
/// down the chain. Terminal rejections nobody will observe are logged.
fn run_failure<T, E>(
    error: E,
    handler: Option<OnReject<T, E>>,
    downstream: Option<Promise<T, E>>,
    age: Duration,
) where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    match handler {
        None => match downstream {
            Some(next) => {
                let _ = next.reject(error);
            }
            None => {
                tracing::debug!(
                    age_ms = age.as_millis() as u64,
                    "promise rejected with no failure handler or downstream"
                );
            }
        },
        Some(handler) => match handler(error.clone()) {
            None => {
                if let Some(next) = downstream {
                    let _ = next.reject(error);
                }
            }
            Some(returned) => {
                if let Some(next) = downstream {
                    returned.adopt(next);
                }
            }
        },
    }
}
