//! Countdown latch: a one-way blocking gate released when the counter hits zero.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A one-way countdown synchronization primitive.
///
/// The counter only ever decreases. Threads blocked in [`wait`](Self::wait)
/// are all released the moment the counter reaches zero; once released, the
/// latch stays open forever.
pub struct CountdownLatch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl CountdownLatch {
    /// Create a latch with the given initial count.
    ///
    /// A count of zero produces an already-open latch.
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Decrement the counter, waking all waiters when it reaches zero.
    ///
    /// Counting down an already-open latch is a no-op.
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    /// Block the calling thread until the counter reaches zero.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.zero.wait(&mut count);
        }
    }

    /// Block until the counter reaches zero or the timeout elapses.
    ///
    /// Returns `true` if the latch opened within the timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.zero.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Current counter value.
    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}
