//! Executor without any resilience policy

use std::sync::Arc;

use crate::action::{Action, Deferred, Execute};

/// Runs an action exactly once and returns its result unchanged
///
/// Useful in tests, or wherever an [`Execute`] implementation is required
/// but retries would be wrong.
#[derive(Debug, Clone, Copy, Default)]
pub struct Single;

impl Single {
    pub fn new() -> Self {
        Self
    }
}

impl Execute for Single {
    fn wrapper<A>(&self, action: A) -> Deferred
    where
        A: Action,
    {
        let action = Arc::new(action);
        Arc::new(move || action.call())
    }
}
