//! Seams between executors and the work they run
//!
//! An [`Action`] is a zero-argument async operation that can be invoked any
//! number of times. Executors implement [`Execute`], which either runs an
//! action to completion or hands back a [`Deferred`] run for later.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use breakwater_common::error::BoxedError;
use futures::future::BoxFuture;
use futures::FutureExt;

/// A re-invocable fallible operation
///
/// Implemented for every `Fn() -> impl Future<Output = Result<(), E>>` whose
/// error converts into [`BoxedError`], so plain closures work:
///
/// ```
/// use breakwater_core::Action;
///
/// let action = || async { Ok::<(), std::io::Error>(()) };
/// let run = action.call();
/// # drop(run);
/// ```
pub trait Action: Send + Sync + 'static {
    /// Start one invocation
    fn call(&self) -> BoxFuture<'static, Result<(), BoxedError>>;
}

impl<F, Fut, E> Action for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxedError> + 'static,
{
    fn call(&self) -> BoxFuture<'static, Result<(), BoxedError>> {
        (self)().map(|result| result.map_err(Into::into)).boxed()
    }
}

/// A deferred execution returned by [`Execute::wrapper`]
///
/// Every call starts an independent run with fresh budgets.
pub type Deferred = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxedError>> + Send + Sync>;

/// Common interface of the executors
#[async_trait]
pub trait Execute: Send + Sync {
    /// Package `action` into a re-invocable run under this executor's policy
    fn wrapper<A>(&self, action: A) -> Deferred
    where
        A: Action;

    /// Run `action` once under this executor's policy
    ///
    /// Equivalent to calling the result of [`Execute::wrapper`] immediately.
    async fn execute<A>(&self, action: A) -> Result<(), BoxedError>
    where
        A: Action,
    {
        let run = self.wrapper(action);
        run().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use breakwater_common::error::{is_repeat, KindError};

    use super::*;

    #[tokio::test]
    async fn test_closure_is_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let action = move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), KindError>(())
            }
        };

        action.call().await.unwrap();
        action.call().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Validates that action errors are boxed without losing their kind.
    #[tokio::test]
    async fn test_action_error_is_boxed() {
        let action = || async { Err::<(), _>(KindError::repeat()) };
        let err = action.call().await.unwrap_err();
        assert!(is_repeat(&*err));
    }

    #[tokio::test]
    async fn test_string_errors_convert() {
        let action = || async { Err::<(), _>("socket closed") };
        let err = action.call().await.unwrap_err();
        assert_eq!(err.to_string(), "socket closed");
    }
}
