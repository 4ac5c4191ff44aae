//! Retry, timeout and success orchestration around a limiter gate
//!
//! A [`Breaker`] runs an action until the success budget is reached, a
//! budget runs out, the action asks to stop, or the environment imposes a
//! stop. One coordinator multiplexes every event source with
//! `tokio::select!`; attempts run as their own tasks and report back over a
//! channel, so the coordinator can give up on a slow attempt without waiting
//! for it.
//!
//! Ready events are picked at random when several fire together.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use breakwater_common::error::{
    find_kind, is_cancel, is_filled, is_repeat, BoxedError, ErrorClassification, ErrorSeverity,
    KindError,
};
use breakwater_common::time::{format_duration_ms, SystemClock};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::action::{Action, Deferred, Execute};
use crate::config::{BreakerConfig, ConfigError, FailureConfig, SuccessConfig, TimeoutConfig};
use crate::limiter::LimiterGate;

type Outcome = Result<(), BoxedError>;

/// Resilient executor
///
/// Cloning is cheap and clones share one limiter gate, so concurrent
/// executions through any clone count against the same admission limits.
/// Budgets and deadlines are per execution.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use breakwater_core::{Breaker, BreakerConfig, Execute};
///
/// # tokio_test::block_on(async {
/// let breaker = Breaker::new(
///     BreakerConfig::builder().failure_cooler(Duration::from_millis(1)).build().unwrap(),
/// )
/// .unwrap();
///
/// breaker.execute(|| async { Ok::<(), std::io::Error>(()) }).await.unwrap();
/// # });
/// ```
#[derive(Clone)]
pub struct Breaker {
    inner: Arc<Inner>,
}

struct Inner {
    failure: FailureConfig,
    success: SuccessConfig,
    timeout: TimeoutConfig,
    gate: LimiterGate,
}

impl Breaker {
    /// Create a breaker from a validated configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroBudget`] if any budget is zero.
    pub fn new(config: BreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let BreakerConfig { failure, limiter, success, timeout } = config;
        let gate = LimiterGate::new(limiter)?;

        Ok(Self { inner: Arc::new(Inner { failure, success, timeout, gate }) })
    }

    /// Create a breaker with every option at its default
    pub fn with_defaults() -> Self {
        let BreakerConfig { failure, limiter, success, timeout } = BreakerConfig::default();
        let gate = LimiterGate::build(limiter, SystemClock);

        Self { inner: Arc::new(Inner { failure, success, timeout, gate }) }
    }

    /// The admission gate shared by every execution of this breaker
    pub fn gate(&self) -> &LimiterGate {
        &self.inner.gate
    }
}

impl Default for Breaker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for Breaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker")
            .field("failure", &self.inner.failure)
            .field("success", &self.inner.success)
            .field("timeout", &self.inner.timeout)
            .field("gate", &self.inner.gate)
            .finish()
    }
}

impl Execute for Breaker {
    fn wrapper<A>(&self, action: A) -> Deferred
    where
        A: Action,
    {
        let inner = self.inner.clone();
        let action: Arc<dyn Action> = Arc::new(action);

        Arc::new(move || run(inner.clone(), action.clone()).boxed())
    }
}

/// Budgets consumed by one execution
#[derive(Debug, Default)]
struct Counters {
    failures: u32,
    successes: u32,
    timeouts: u32,
}

#[instrument(
    name = "breaker",
    skip_all,
    fields(
        failure_budget = inner.failure.budget,
        success_budget = inner.success.budget,
        timeout_budget = inner.timeout.budget,
    )
)]
async fn run(inner: Arc<Inner>, action: Arc<dyn Action>) -> Outcome {
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
    let mut counts = Counters::default();
    let mut armed = true;

    let global = inner.timeout.global;
    let deadline = global.map(|limit| Instant::now() + limit);
    let global_timer = until(deadline);
    tokio::pin!(global_timer);

    loop {
        tokio::select! {
            () = std::future::ready(()), if armed => {
                armed = false;
                launch(&inner, &action, &tx);
            }
            Some(outcome) = rx.recv() => match outcome {
                Ok(()) => {
                    counts.successes += 1;
                    debug!(successes = counts.successes, "Attempt succeeded");
                    if counts.successes >= inner.success.budget {
                        return Ok(());
                    }
                    armed = true;
                }
                Err(err) => {
                    if is_cancel(&*err) || is_filled(&*err) {
                        return Err(terminal(err, &counts));
                    }

                    if is_repeat(&*err) {
                        debug!("Attempt asked to repeat");
                    } else {
                        counts.failures += 1;
                        if counts.failures >= inner.failure.budget {
                            warn!(
                                failures = counts.failures,
                                budget = inner.failure.budget,
                                "Failure budget exhausted"
                            );
                            return Err(terminal(err, &counts));
                        }

                        debug!(failures = counts.failures, error = %err, "Attempt failed");
                        cool_down(inner.failure.cooler).await;
                    }
                    armed = true;
                }
            },
            () = closed(inner.timeout.closer.as_ref()) => {
                let err = KindError::closed().with_detail("execution stopped by closer");
                return Err(terminal(err.boxed(), &counts));
            }
            () = &mut global_timer => {
                let limit = global.map(format_duration_ms).unwrap_or_default();
                let err = KindError::passed().with_detail(format!("global deadline of {limit} reached"));
                return Err(terminal(err.boxed(), &counts));
            }
            () = after(inner.timeout.action) => {
                counts.timeouts += 1;
                if counts.timeouts >= inner.timeout.budget {
                    let limit = inner.timeout.action.map(format_duration_ms).unwrap_or_default();
                    let err = KindError::passed()
                        .with_detail(format!("{} attempts exceeded {limit}", counts.timeouts));
                    return Err(terminal(err.boxed(), &counts));
                }

                debug!(timeouts = counts.timeouts, "Attempt timed out");
                cool_down(inner.timeout.cooler).await;
                armed = true;
            }
        }
    }
}

/// Start one gated attempt in the background
///
/// The attempt reports exactly one outcome unless the coordinator already
/// returned, in which case the send fails and the outcome is dropped.
///
/// A panicking action is reported as a failure only in builds that unwind;
/// under `panic = "abort"` (the release profile) the process aborts.
fn launch(inner: &Arc<Inner>, action: &Arc<dyn Action>, tx: &mpsc::UnboundedSender<Outcome>) {
    let inner = inner.clone();
    let action = action.clone();
    let tx = tx.clone();

    debug!("Launching attempt");
    tokio::spawn(async move {
        let attempt = inner.gate.admit(|| action.call());
        let outcome = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => Err(BoxedError::from("action panicked")),
        };
        let _ = tx.send(outcome);
    });
}

/// Log a terminal error at the level its classification asks for
fn terminal(err: BoxedError, counts: &Counters) -> BoxedError {
    let severity = find_kind(&*err).map_or(ErrorSeverity::Error, ErrorClassification::severity);

    match severity {
        ErrorSeverity::Info => info!(?counts, error = %err, "Execution stopped"),
        ErrorSeverity::Warning => warn!(?counts, error = %err, "Execution stopped"),
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(?counts, error = %err, "Execution failed");
        }
    }

    err
}

async fn cool_down(cooler: Option<Duration>) {
    if let Some(cooler) = cooler {
        debug!(cooler_ms = u64::try_from(cooler.as_millis()).unwrap_or(u64::MAX), "Cooling down");
        sleep(cooler).await;
    }
}

/// Resolve after `timeout`, or never when disabled
async fn after(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => sleep(timeout).await,
        None => std::future::pending().await,
    }
}

/// Resolve at `deadline`, or never when disabled
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Resolve once the closer fires, or never without one
async fn closed(closer: Option<&CancellationToken>) {
    match closer {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the breaker state machine.
    use std::sync::atomic::{AtomicUsize, Ordering};

    use breakwater_common::error::{is_closed, is_passed, kind_of, ErrorKind, WrapExt};

    use super::*;

    fn fast() -> crate::config::BreakerConfigBuilder {
        BreakerConfig::builder().no_failure_cooler()
    }

    fn counting<F>(calls: &Arc<AtomicUsize>, result: F) -> impl Action
    where
        F: Fn(usize) -> Outcome + Send + Sync + 'static,
    {
        let calls = calls.clone();
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = result(n);
            async move { outcome }
        }
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = BreakerConfig { success: SuccessConfig { budget: 0 }, ..Default::default() };
        assert!(matches!(Breaker::new(config), Err(ConfigError::ZeroBudget { group: "success" })));
    }

    #[test]
    fn test_with_defaults_matches_default_config() {
        let breaker = Breaker::default();
        assert_eq!(breaker.inner.failure, FailureConfig::default());
        assert_eq!(breaker.gate().budget(), 3);
        assert_eq!(breaker.gate().window(), None);
        assert_eq!(breaker.inner.timeout.action, Some(Duration::from_secs(3)));
    }

    /// Validates that a generic error recovers once the action succeeds.
    ///
    /// Assertions:
    /// - Two failures within a budget of three still end in success.
    /// - The action ran exactly three times.
    #[tokio::test]
    async fn test_recovers_within_failure_budget() {
        let breaker = Breaker::new(fast().build().unwrap()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let action = counting(&calls, |n| if n < 3 { Err("flaky".into()) } else { Ok(()) });
        breaker.execute(action).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_returned_verbatim() {
        let breaker = Breaker::new(fast().failure_budget(2).build().unwrap()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let action = counting(&calls, |n| Err(format!("attempt {n} failed").into()));
        let err = breaker.execute(action).await.unwrap_err();

        assert_eq!(err.to_string(), "attempt 2 failed");
        assert_eq!(kind_of(&*err), None);
    }

    /// Validates that a wrapped cancel stops the loop with the original
    /// error, regardless of remaining budget.
    #[tokio::test]
    async fn test_wrapped_cancel_stops_immediately() {
        let breaker = Breaker::new(fast().failure_budget(10).build().unwrap()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let action = counting(&calls, |_| {
            Err(Err::<(), _>(KindError::cancel()).wrap_err("remote said stop").unwrap_err().into())
        });
        let err = breaker.execute(action).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(is_cancel(&*err));
        assert_eq!(err.to_string(), "remote said stop: cancel");
    }

    #[tokio::test]
    async fn test_repeat_then_success() {
        let breaker = Breaker::new(fast().failure_budget(1).build().unwrap()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let action = counting(&calls, |n| if n <= 5 { Err(KindError::repeat().boxed()) } else { Ok(()) });
        breaker.execute(action).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_action_timeout_exhausts_budget() {
        let config = fast().action_timeout(Duration::from_millis(20)).timeout_budget(2).build().unwrap();
        let breaker = Breaker::new(config).unwrap();

        let err = breaker
            .execute(|| async {
                sleep(Duration::from_secs(5)).await;
                Ok::<(), BoxedError>(())
            })
            .await
            .unwrap_err();

        assert!(is_passed(&*err));
        assert_eq!(err.to_string(), "passed: 2 attempts exceeded 20ms");
    }

    #[tokio::test]
    async fn test_pre_cancelled_closer() {
        let closer = CancellationToken::new();
        closer.cancel();
        let config = fast().no_action_timeout().closer(closer).build().unwrap();
        let breaker = Breaker::new(config).unwrap();

        let err = breaker.execute(|| std::future::pending::<Outcome>()).await.unwrap_err();
        assert!(is_closed(&*err));
    }

    #[tokio::test]
    async fn test_panicking_action_counts_as_failure() {
        let breaker = Breaker::new(fast().failure_budget(2).build().unwrap()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let action = counting(&calls, |n| if n == 1 { panic!("boom") } else { Ok(()) });
        breaker.execute(action).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_terminal_passes_error_through() {
        let err = terminal(KindError::filled().boxed(), &Counters::default());
        assert_eq!(kind_of(&*err), Some(ErrorKind::Filled));

        let err = terminal("plain".into(), &Counters::default());
        assert_eq!(err.to_string(), "plain");
    }
}
