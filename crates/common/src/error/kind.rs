//! Error taxonomy driving execution decisions
//!
//! Five distinguished kinds are recognised by the executors. Each is a
//! comparable sentinel ([`KindError`]) that may be returned as-is or wrapped
//! with context; identity is resolved by walking the source chain.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::{BoxedError, ErrorClassification, ErrorSeverity};

/// The five error kinds that drive executor decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Returned by actions to break the execution loop regardless of budget
    Cancel,
    /// Returned by executors when the external closer signal fired
    Closed,
    /// Returned by the limiter when an admission was rejected
    Filled,
    /// Returned by executors when a timeout budget or deadline ran out
    Passed,
    /// Returned by actions to run again without consuming any budget
    Repeat,
}

crate::impl_status_conversions!(ErrorKind {
    Cancel => "cancel",
    Closed => "closed",
    Filled => "filled",
    Passed => "passed",
    Repeat => "repeat",
});

impl ErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [ErrorKind; 5] =
        [ErrorKind::Cancel, ErrorKind::Closed, ErrorKind::Filled, ErrorKind::Passed, ErrorKind::Repeat];

    /// Longer explanation of what the kind means to an execution loop
    pub fn description(self) -> &'static str {
        match self {
            Self::Cancel => {
                "returned by actions to break the execution loop; forces the executor to stop \
                 any further executions regardless of the remaining budget"
            }
            Self::Closed => {
                "returned by executors when the configured closer signal fired, e.g. because \
                 the process received a shutdown request"
            }
            Self::Filled => {
                "returned by the limiter when its admission queue is full, either because too \
                 many actions are running or too many were admitted within the window"
            }
            Self::Passed => {
                "returned by executors when a timeout expired, either the per-attempt budget or \
                 the global deadline of a single execution"
            }
            Self::Repeat => {
                "returned by actions to repeat the execution loop early without taking away from \
                 the failure or success budget"
            }
        }
    }

    /// Check whether `err`, or anything in its source chain, is of this kind
    pub fn matches(self, err: &(dyn StdError + 'static)) -> bool {
        chain(err).any(|e| e.downcast_ref::<KindError>().is_some_and(|k| k.kind == self))
    }
}

/// Sentinel error value carrying one [`ErrorKind`]
///
/// Two `KindError`s compare equal when kind, detail and retry hint match;
/// classification only ever looks at the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindError {
    kind: ErrorKind,
    detail: Option<String>,
    retry_after: Option<Duration>,
}

/// Sentinel for [`ErrorKind::Cancel`]
pub const CANCEL: KindError = KindError::new(ErrorKind::Cancel);
/// Sentinel for [`ErrorKind::Closed`]
pub const CLOSED: KindError = KindError::new(ErrorKind::Closed);
/// Sentinel for [`ErrorKind::Filled`]
pub const FILLED: KindError = KindError::new(ErrorKind::Filled);
/// Sentinel for [`ErrorKind::Passed`]
pub const PASSED: KindError = KindError::new(ErrorKind::Passed);
/// Sentinel for [`ErrorKind::Repeat`]
pub const REPEAT: KindError = KindError::new(ErrorKind::Repeat);

impl KindError {
    /// Create a bare sentinel of the given kind
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, detail: None, retry_after: None }
    }

    /// The action gave up; stop at once
    pub fn cancel() -> Self {
        CANCEL
    }

    /// The closer fired
    pub fn closed() -> Self {
        CLOSED
    }

    /// The limiter gate turned the call away
    pub fn filled() -> Self {
        FILLED
    }

    /// A deadline or the attempt timeout budget ran out
    pub fn passed() -> Self {
        PASSED
    }

    /// Try again without counting a failure
    pub fn repeat() -> Self {
        REPEAT
    }

    /// Attach human-readable detail, shown after the kind name
    #[must_use]
    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach a suggested delay before trying again
    #[must_use]
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// The taxonomy kind of this sentinel
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable detail, if any
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Box the sentinel into the error type actions return
    pub fn boxed(self) -> BoxedError {
        Box::new(self)
    }
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind, detail),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for KindError {}

impl ErrorClassification for KindError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Repeat)
    }

    fn severity(&self) -> ErrorSeverity {
        match self.kind {
            ErrorKind::Cancel | ErrorKind::Closed | ErrorKind::Repeat => ErrorSeverity::Info,
            ErrorKind::Filled | ErrorKind::Passed => ErrorSeverity::Warning,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// An error with added context, keeping the original as its source
#[derive(Debug, Error)]
#[error("{context}: {source}")]
pub struct Wrapped {
    context: String,
    #[source]
    source: BoxedError,
}

impl Wrapped {
    /// Wrap `source` with `context`
    pub fn new<C, E>(context: C, source: E) -> Self
    where
        C: Into<String>,
        E: Into<BoxedError>,
    {
        Self { context: context.into(), source: source.into() }
    }

    /// The added context
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Extension for adding context to fallible results
pub trait WrapExt<T> {
    /// Wrap the error, if any, with `context`
    fn wrap_err<C: Into<String>>(self, context: C) -> Result<T, Wrapped>;
}

impl<T, E> WrapExt<T> for Result<T, E>
where
    E: Into<BoxedError>,
{
    fn wrap_err<C: Into<String>>(self, context: C) -> Result<T, Wrapped> {
        self.map_err(|e| Wrapped::new(context, e))
    }
}

/// Iterate over `err` and every error in its source chain, outermost first
pub fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> + 'a {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Find the outermost [`KindError`] in the source chain
pub fn find_kind<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a KindError> {
    chain(err).find_map(|e| e.downcast_ref::<KindError>())
}

/// Classify `err` by its outermost taxonomy kind, if it carries one
pub fn kind_of(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    find_kind(err).map(KindError::kind)
}

pub fn is_cancel(err: &(dyn StdError + 'static)) -> bool {
    ErrorKind::Cancel.matches(err)
}

pub fn is_closed(err: &(dyn StdError + 'static)) -> bool {
    ErrorKind::Closed.matches(err)
}

pub fn is_filled(err: &(dyn StdError + 'static)) -> bool {
    ErrorKind::Filled.matches(err)
}

pub fn is_passed(err: &(dyn StdError + 'static)) -> bool {
    ErrorKind::Passed.matches(err)
}

pub fn is_repeat(err: &(dyn StdError + 'static)) -> bool {
    ErrorKind::Repeat.matches(err)
}

#[cfg(test)]
mod tests {
    //! Unit tests for error::kind.
    use std::collections::HashSet;
    use std::str::FromStr;

    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    /// Validates that every kind renders and parses as its lowercase name.
    #[test]
    fn test_kind_name_round_trip() {
        for kind in ErrorKind::ALL {
            let name = kind.to_string();
            assert_eq!(name, name.to_lowercase());
            assert_eq!(ErrorKind::from_str(&name).unwrap(), kind);
        }
        assert!(ErrorKind::from_str("broken").is_err());
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(CANCEL.to_string(), "cancel");
        assert_eq!(
            KindError::filled().with_detail("3 actions already queued").to_string(),
            "filled: 3 actions already queued"
        );
    }

    /// Validates that a bare sentinel classifies as its own kind only.
    #[test]
    fn test_bare_sentinel_classification() {
        let err = KindError::repeat();
        assert!(is_repeat(&err));
        assert!(!is_cancel(&err));
        assert!(!is_filled(&err));
        assert_eq!(kind_of(&err), Some(ErrorKind::Repeat));
    }

    /// Validates that kinds survive several layers of wrapping.
    ///
    /// Assertions:
    /// - The outer layer is not a `KindError` itself.
    /// - `is_cancel` still finds the sentinel two layers down.
    /// - The rendered message keeps every context layer.
    #[test]
    fn test_wrapped_sentinel_classification() {
        let inner = Wrapped::new("fetching job", CANCEL);
        let outer: BoxedError = Box::new(Wrapped::new("worker 7", inner));

        assert!(outer.downcast_ref::<KindError>().is_none());
        assert!(is_cancel(&*outer));
        assert!(!is_closed(&*outer));
        assert_eq!(kind_of(&*outer), Some(ErrorKind::Cancel));
        assert_eq!(outer.to_string(), "worker 7: fetching job: cancel");
    }

    #[test]
    fn test_generic_error_has_no_kind() {
        let err: BoxedError = Box::new(Wrapped::new("copying", DiskError));
        assert_eq!(kind_of(&*err), None);
        assert!(ErrorKind::ALL.iter().all(|kind| !kind.matches(&*err)));
    }

    #[test]
    fn test_wrap_ext_on_result() {
        let result: Result<(), KindError> = Err(PASSED);
        let wrapped = result.wrap_err("waiting for upload").unwrap_err();

        assert_eq!(wrapped.context(), "waiting for upload");
        assert!(is_passed(&wrapped));

        let source = StdError::source(&wrapped).unwrap();
        assert_eq!(source.downcast_ref::<KindError>(), Some(&PASSED));
    }

    /// Validates that `chain` yields every layer, outermost first.
    #[test]
    fn test_chain_walks_every_layer() {
        let err = Wrapped::new("worker 3", Wrapped::new("polling queue", REPEAT));

        let layers: Vec<String> = chain(&err).map(ToString::to_string).collect();
        assert_eq!(
            layers,
            ["worker 3: polling queue: repeat", "polling queue: repeat", "repeat"]
        );
        assert!(is_repeat(&err));
    }

    /// Validates `find_kind` returns the outermost sentinel and its detail.
    #[test]
    fn test_find_kind_returns_outermost() {
        let inner = KindError::filled().with_detail("actions throttled for another 1s");
        let err = Wrapped::new("admitting", inner);

        let found = find_kind(&err).unwrap();
        assert_eq!(found.kind(), ErrorKind::Filled);
        assert_eq!(found.detail(), Some("actions throttled for another 1s"));
    }

    #[test]
    fn test_kind_error_classification() {
        assert!(REPEAT.is_retryable());
        assert!(!CANCEL.is_retryable());
        assert_eq!(CLOSED.severity(), ErrorSeverity::Info);
        assert_eq!(FILLED.severity(), ErrorSeverity::Warning);
        assert!(!PASSED.is_critical());

        let throttled = KindError::filled().with_retry_after(Duration::from_millis(250));
        assert_eq!(throttled.retry_after(), Some(Duration::from_millis(250)));
        assert_eq!(CANCEL.retry_after(), None);
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let seen: HashSet<&str> = ErrorKind::ALL.iter().map(|k| k.description()).collect();
        assert_eq!(seen.len(), ErrorKind::ALL.len());
    }
}
