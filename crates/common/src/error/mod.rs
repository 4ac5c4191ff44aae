//! Common error types and utilities shared by every breakwater crate
//!
//! This module provides the error handling infrastructure the executors are
//! built on. It includes the error taxonomy that drives retry decisions, the
//! classification trait used for logging and monitoring, and the boxed error
//! type actions report failures with.
//!
//! # Error Handling Architecture
//!
//! The error handling system is built on three key components:
//!
//! 1. **[`KindError`]**: A sentinel error carrying one of the five taxonomy
//!    kinds (`cancel`, `closed`, `filled`, `passed`, `repeat`) plus optional
//!    human-readable detail.
//!
//! 2. **[`Wrapped`]**: Context added around any error while keeping the
//!    original as its `source`, so the kind stays discoverable.
//!
//! 3. **`ErrorClassification` trait**: A standard interface for classifying
//!    errors by their characteristics (retryability, severity, criticality)
//!
//! ## Taxonomy
//!
//! | Kind | Produced by | Effect on an execution loop |
//! |------|-------------|-----------------------------|
//! | **cancel** | actions | stop immediately, regardless of budget |
//! | **closed** | executors | the external closer signal fired |
//! | **filled** | the limiter | admission was rejected, stop immediately |
//! | **passed** | executors | a timeout budget or the global deadline ran out |
//! | **repeat** | actions | retry at once without consuming any budget |
//!
//! ## Identity Through Wrapping
//!
//! Classification never compares the outermost error. It walks the
//! `std::error::Error::source` chain and reports the first [`KindError`] it
//! finds, so an action may freely wrap a sentinel with context:
//!
//! ```rust
//! use breakwater_common::error::{is_cancel, BoxedError, WrapExt, CANCEL};
//!
//! fn action() -> Result<(), BoxedError> {
//!     Err::<(), _>(CANCEL).wrap_err("remote refused the job")?;
//!     Ok(())
//! }
//!
//! let err = action().unwrap_err();
//! assert!(is_cancel(&*err));
//! ```
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Informational, expected conditions | cancel, closed, repeat |
//! | **Warning** | Degraded but operational | filled, passed |
//! | **Error** | Failure requiring attention | configuration errors |
//! | **Critical** | System integrity at risk | internal invariant violations |

use std::fmt;
use std::time::Duration;

pub mod kind;

pub use kind::{
    chain, find_kind, is_cancel, is_closed, is_filled, is_passed, is_repeat, kind_of, ErrorKind,
    KindError, WrapExt, Wrapped, CANCEL, CLOSED, FILLED, PASSED, REPEAT,
};

/// Boxed error type actions and executors report failures with
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait for classifying errors by their characteristics
///
/// # Example
///
/// ```rust
/// use breakwater_common::error::{ErrorClassification, ErrorSeverity, KindError};
///
/// let err = KindError::passed();
/// assert!(!err.is_retryable());
/// assert_eq!(err.severity(), ErrorSeverity::Warning);
/// ```
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: attempting the same operation again
    /// may succeed.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for monitoring, alerting, and logging decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific delay is known, e.g. the
    /// remaining length of a limiter window.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for severity ordering and display.

    use super::*;

    /// Validates that severities order from least to most serious.
    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(ErrorSeverity::Error.to_string(), "ERROR");
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }
}
