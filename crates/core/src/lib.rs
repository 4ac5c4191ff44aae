//! # Breakwater Core
//!
//! Retry, rate-limit, timeout and cancellation policies around fallible
//! async actions.
//!
//! This crate contains:
//! - [`Breaker`]: the execution orchestrator
//! - [`LimiterGate`]: concurrency and rolling-window admission control
//! - [`Single`]: a pass-through executor without any policy
//! - [`config`]: configuration groups, builder and loader
//!
//! ## Outcomes
//! An execution succeeds once the success budget is reached. Otherwise it
//! fails with one of:
//! - the action's own error, once the failure budget is spent
//! - an action's `cancel`, or a limiter `filled` rejection, at once
//! - `passed`, when the attempt timeout budget or the global deadline ran out
//! - `closed`, when the configured closer fired
//!
//! Kinds are matched through the error's source chain, see
//! [`breakwater_common::error`].

pub mod action;
pub mod breaker;
pub mod config;
pub mod limiter;
pub mod single;

pub use action::{Action, Deferred, Execute};
pub use breaker::Breaker;
pub use config::{
    BreakerConfig, BreakerConfigBuilder, ConfigError, FailureConfig, LimiterConfig, SuccessConfig,
    TimeoutConfig,
};
pub use limiter::{LimiterGate, LimiterSnapshot};
pub use single::Single;
