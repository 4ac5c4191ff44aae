//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: timeouts and polling for async assertions
//! - **[`counter`]**: invocation counting with peak-concurrency tracking
//! - [`init_tracing`]: log capture for tests, filtered by `RUST_LOG`
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use breakwater_common::testing::{CallCounter, MockClock};
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(5));
//!
//! let counter = CallCounter::new();
//! counter.hit();
//! assert_eq!(counter.calls(), 1);
//! ```

pub mod async_utils;
pub mod counter;

use std::sync::Once;

pub use async_utils::{poll_until, timed, timeout_ok};
pub use counter::{CallCounter, CallGuard};

pub use crate::time::{Clock, MockClock, SystemClock};

static TRACING: Once = Once::new();

/// Install a test-friendly `tracing` subscriber once per process
///
/// Output goes through the test writer so it is only shown for failing
/// tests. The filter comes from `RUST_LOG`, defaulting to `debug` for the
/// breakwater crates.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("breakwater_core=debug,breakwater_common=debug,warn")
        });

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
