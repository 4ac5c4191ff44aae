//! Time utilities and abstractions
//!
//! This module provides the time handling the executors rely on:
//! - **[`clock`]**: Real and mock clocks, so windowed admission can be tested
//!   without sleeping
//! - **[`format`]**: Human-readable duration formatting for error detail
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use breakwater_common::time::{format_duration_ms, Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_millis(1500));
//!
//! assert_eq!(format_duration_ms(clock.now() - start), "1s 500ms");
//! ```

pub mod clock;
pub mod format;

pub use clock::{Clock, MockClock, SystemClock};
pub use format::{format_duration, format_duration_ms};
