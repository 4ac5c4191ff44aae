//! Admission gate bounding concurrency and throughput
//!
//! A [`LimiterGate`] admits at most `budget` invocations at the same time
//! and, when a window is configured, at most `budget` admissions within any
//! rolling window. Admission never waits: a caller that does not fit is
//! rejected at once with a `filled` error.
//!
//! Two fixed-capacity semaphores hold the slots. A concurrency slot is held
//! for exactly as long as the admitted operation runs. A rate slot is taken
//! on admission and only handed back by a later caller once the admission
//! timestamp it belongs to has aged out of the window.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use breakwater_common::error::{BoxedError, KindError};
use breakwater_common::time::{format_duration_ms, Clock, SystemClock};
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::config::{ConfigError, LimiterConfig};

/// Point-in-time view of a gate's occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSnapshot {
    /// Configured slot count of both pools
    pub budget: usize,
    /// Rolling window length, if rate limiting is enabled
    pub window: Option<Duration>,
    /// Invocations currently running
    pub running: usize,
    /// Rate slots held by recorded admissions
    pub held: usize,
    /// Age of the oldest recorded admission
    pub oldest_age: Option<Duration>,
}

impl LimiterSnapshot {
    /// Whether a caller arriving now would be rejected for concurrency
    pub fn is_saturated(&self) -> bool {
        self.running >= self.budget
    }

    /// Remaining wait until the oldest admission leaves the window
    ///
    /// `None` when rate limiting is disabled or the rate pool is not full.
    pub fn throttled_for(&self) -> Option<Duration> {
        let window = self.window?;
        if self.held < self.budget {
            return None;
        }
        let age = self.oldest_age?;
        Some(window.saturating_sub(age)).filter(|wait| !wait.is_zero())
    }
}

/// Non-blocking admission gate shared by concurrent callers
///
/// # Examples
///
/// ```
/// use breakwater_core::{LimiterConfig, LimiterGate};
///
/// # tokio_test::block_on(async {
/// let gate = LimiterGate::new(LimiterConfig::default()).unwrap();
/// gate.admit(|| async { Ok::<(), std::io::Error>(()) }).await.unwrap();
/// assert_eq!(gate.snapshot().held, 1);
/// # });
/// ```
pub struct LimiterGate<C: Clock = SystemClock> {
    budget: usize,
    window: Option<Duration>,
    clock: C,
    stamps: Mutex<VecDeque<Instant>>,
    rate: Semaphore,
    running: Arc<Semaphore>,
}

impl LimiterGate<SystemClock> {
    /// Create a gate reading time from the system clock
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroBudget`] if the budget is zero.
    pub fn new(config: LimiterConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LimiterGate<C> {
    /// Create a gate reading time from `clock`
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroBudget`] if the budget is zero.
    pub fn with_clock(config: LimiterConfig, clock: C) -> Result<Self, ConfigError> {
        if config.budget == 0 {
            return Err(ConfigError::ZeroBudget { group: "limiter" });
        }

        Ok(Self::build(config, clock))
    }

    /// Create a gate from a configuration known to be valid
    pub(crate) fn build(config: LimiterConfig, clock: C) -> Self {
        let budget = config.budget.max(1);
        Self {
            budget,
            window: config.cooler,
            clock,
            stamps: Mutex::new(VecDeque::with_capacity(budget)),
            rate: Semaphore::new(budget),
            running: Arc::new(Semaphore::new(budget)),
        }
    }

    /// Run `operation` if a slot is free, otherwise reject with `filled`
    ///
    /// The caller waits for the operation itself but never for admission.
    /// The operation's result is returned unmodified.
    ///
    /// # Errors
    /// Returns a `filled` [`KindError`] when the window or the concurrency
    /// pool is full, or whatever error the operation produced.
    #[instrument(level = "debug", skip_all, fields(budget = self.budget))]
    pub async fn admit<F, Fut, E>(&self, operation: F) -> Result<(), BoxedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<BoxedError>,
    {
        let _permit = self.try_enter().map_err(KindError::boxed)?;

        debug!(running = self.running_count(), "Limiter admitted operation");
        operation().await.map_err(Into::into)
    }

    /// Reserve one rate slot and one concurrency slot, or explain why not
    fn try_enter(&self) -> Result<OwnedSemaphorePermit, KindError> {
        let mut stamps = self.stamps.lock();
        let now = self.clock.now();

        let age = stamps.front().map(|oldest| now.saturating_duration_since(*oldest));
        let window = self.window.unwrap_or(Duration::ZERO);

        if self.rate.available_permits() == 0 && age.unwrap_or(Duration::ZERO) >= window {
            self.evict(&mut stamps, now);
        }

        let view = self.occupancy(&stamps, now);
        if let Some(remaining) = view.throttled_for() {
            warn!(
                remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                "Limiter window full, rejecting"
            );
            return Err(KindError::filled()
                .with_detail(format!("actions throttled for another {}", format_duration_ms(remaining)))
                .with_retry_after(remaining));
        }

        if view.is_saturated() {
            return Err(queue_full(view.running));
        }

        // Running slots are released without the lock, so the count above
        // may be stale; the semaphore has the final say.
        let Ok(permit) = self.running.clone().try_acquire_owned() else {
            return Err(queue_full(self.running_count()));
        };

        // Rate slots only change under the stamps lock, and a full pool was
        // either evicted above or rejected.
        let Ok(rate) = self.rate.try_acquire() else {
            return Err(queue_full(self.running_count()));
        };
        rate.forget();
        stamps.push_back(now);

        Ok(permit)
    }

    /// Release the rate slot of every admission that left the window
    ///
    /// With rate limiting disabled every recorded admission is released.
    fn evict(&self, stamps: &mut VecDeque<Instant>, now: Instant) {
        let mut released = 0;
        while let Some(oldest) = stamps.front() {
            let expired = match self.window {
                Some(window) => now.saturating_duration_since(*oldest) >= window,
                None => true,
            };
            if !expired {
                break;
            }
            stamps.pop_front();
            released += 1;
        }

        if released > 0 {
            self.rate.add_permits(released);
            debug!(released, "Limiter released rate slots");
        }
    }

    fn running_count(&self) -> usize {
        self.budget.saturating_sub(self.running.available_permits())
    }

    fn occupancy(&self, stamps: &VecDeque<Instant>, now: Instant) -> LimiterSnapshot {
        LimiterSnapshot {
            budget: self.budget,
            window: self.window,
            running: self.running_count(),
            held: stamps.len(),
            oldest_age: stamps.front().map(|oldest| now.saturating_duration_since(*oldest)),
        }
    }

    /// Current occupancy of both pools
    pub fn snapshot(&self) -> LimiterSnapshot {
        let stamps = self.stamps.lock();
        self.occupancy(&stamps, self.clock.now())
    }

    /// Slot count of both pools
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Rolling window length, if rate limiting is enabled
    pub fn window(&self) -> Option<Duration> {
        self.window
    }
}

fn queue_full(queued: usize) -> KindError {
    warn!(queued, "Limiter concurrency full, rejecting");
    KindError::filled().with_detail(format!("{queued} actions already queued"))
}

impl<C: Clock> fmt::Debug for LimiterGate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("LimiterGate")
            .field("budget", &snapshot.budget)
            .field("window", &snapshot.window)
            .field("running", &snapshot.running)
            .field("held", &snapshot.held)
            .finish()
    }
}
