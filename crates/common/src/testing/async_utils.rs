//! Async testing utilities
//!
//! Helpers for waiting on executor outcomes without hanging a test forever.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::time::Duration;

/// Assert that an async condition becomes true within a timeout
///
/// The condition is re-evaluated every 10ms.
///
/// # Examples
///
/// ```no_run
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::test(flavor = "multi_thread")]
/// async fn test_eventually() {
///     let done = Arc::new(AtomicBool::new(false));
///     let flag = done.clone();
///
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(100)).await;
///         flag.store(true, Ordering::SeqCst);
///     });
///
///     breakwater_common::assert_eventually_async!(Duration::from_secs(1), async {
///         done.load(Ordering::SeqCst)
///     });
/// }
/// ```
#[macro_export]
macro_rules! assert_eventually_async {
    ($timeout:expr, $fut:expr) => {{
        let timeout_duration = $timeout;
        let result = tokio::time::timeout(timeout_duration, async {
            loop {
                if $fut.await {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;

        assert!(result.is_ok(), "Condition did not become true within {:?}", timeout_duration);
    }};
}

/// Wait for a future with a timeout, returning `Err(Elapsed)` if it ran out
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll a condition every `interval` until it holds or `timeout` passes
///
/// Returns whether the condition held.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Measure how long a future takes to resolve
pub async fn timed<F, T>(fut: F) -> (T, Duration)
where
    F: Future<Output = T>,
{
    let start = tokio::time::Instant::now();
    let value = fut.await;
    (value, start.elapsed())
}
