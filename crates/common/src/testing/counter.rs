//! Invocation counting for executor tests
//!
//! [`CallCounter`] records how often an action ran and how many runs
//! overlapped at most, which is what budget and limiter tests assert on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counter of action invocations with peak-concurrency tracking
///
/// Clones share state, so a clone can be moved into an action closure while
/// the test keeps the original for assertions.
///
/// ```
/// use breakwater_common::testing::CallCounter;
///
/// let counter = CallCounter::new();
/// {
///     let _first = counter.enter();
///     let _second = counter.enter();
///     assert_eq!(counter.running(), 2);
/// }
/// assert_eq!(counter.calls(), 2);
/// assert_eq!(counter.peak(), 2);
/// assert_eq!(counter.running(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one invocation without tracking its duration
    ///
    /// Returns the invocation number, starting at 1.
    pub fn hit(&self) -> usize {
        self.inner.calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Count one invocation and mark it running until the guard drops
    #[must_use = "the invocation stops counting as running when the guard drops"]
    pub fn enter(&self) -> CallGuard {
        self.hit();
        let now = self.inner.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        CallGuard { inner: self.inner.clone() }
    }

    /// Total invocations so far
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Invocations currently holding a guard
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running invocations observed
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

/// Marks one invocation as running; see [`CallCounter::enter`]
#[derive(Debug)]
pub struct CallGuard {
    inner: Arc<Inner>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.inner.running.fetch_sub(1, Ordering::SeqCst);
    }
}
