//! Breaker configuration
//!
//! Four groups of settings control an execution: [`FailureConfig`],
//! [`SuccessConfig`], [`LimiterConfig`] and [`TimeoutConfig`]. A disabled
//! duration is `None`; in configuration files it is written as a negative
//! number of milliseconds.
//!
//! | Group | Option | Default |
//! |---|---|---|
//! | failure | budget | 3 |
//! | failure | cooler | 1s |
//! | success | budget | 1 |
//! | limiter | budget | 3 |
//! | limiter | cooler | disabled |
//! | timeout | action | 3s |
//! | timeout | budget | 1 |
//! | timeout | cooler | disabled |
//! | timeout | global | disabled |
//! | timeout | closer | none |

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use breakwater_common::error::{ErrorClassification, ErrorSeverity};
use breakwater_common::optional_duration_millis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};

/// Errors raised while building or loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{group} budget must be greater than 0")]
    ZeroBudget { group: &'static str },

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no config file found in any of the standard locations")]
    NoConfigFile,

    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML format: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

impl ErrorClassification for ConfigError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// How many failed attempts an execution tolerates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    /// Counted failures after which the last error is returned
    pub budget: u32,
    /// Sleep after each counted failure
    #[serde(with = "optional_duration_millis")]
    pub cooler: Option<Duration>,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self { budget: 3, cooler: Some(Duration::from_secs(1)) }
    }
}

/// How many successful attempts make an execution succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessConfig {
    pub budget: u32,
}

impl Default for SuccessConfig {
    fn default() -> Self {
        Self { budget: 1 }
    }
}

/// Admission limits of the gate shared by every execution of one breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Maximum concurrent invocations, and maximum admissions per window
    pub budget: usize,
    /// Rolling window length; `None` disables rate limiting
    #[serde(with = "optional_duration_millis")]
    pub cooler: Option<Duration>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self { budget: 3, cooler: None }
    }
}

/// Deadlines and the external cancellation signal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a single attempt is waited for
    #[serde(with = "optional_duration_millis")]
    pub action: Option<Duration>,
    /// Attempt timeouts after which the execution fails with `passed`
    pub budget: u32,
    /// Sleep after each counted attempt timeout
    #[serde(with = "optional_duration_millis")]
    pub cooler: Option<Duration>,
    /// Hard limit for the whole execution
    #[serde(with = "optional_duration_millis")]
    pub global: Option<Duration>,
    /// Externally owned signal that stops executions with `closed`
    #[serde(skip)]
    pub closer: Option<CancellationToken>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            action: Some(Duration::from_secs(3)),
            budget: 1,
            cooler: None,
            global: None,
            closer: None,
        }
    }
}

/// Complete breaker configuration
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use breakwater_core::BreakerConfig;
///
/// let config = BreakerConfig::builder()
///     .failure_budget(5)
///     .limiter_window(Duration::from_millis(500))
///     .no_action_timeout()
///     .build()
///     .unwrap();
///
/// assert_eq!(config.failure.budget, 5);
/// assert_eq!(config.timeout.action, None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure: FailureConfig,
    pub limiter: LimiterConfig,
    pub success: SuccessConfig,
    pub timeout: TimeoutConfig,
}

impl BreakerConfig {
    /// Create a new configuration builder
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroBudget`] for the first group whose budget
    /// is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure.budget == 0 {
            return Err(ConfigError::ZeroBudget { group: "failure" });
        }
        if self.success.budget == 0 {
            return Err(ConfigError::ZeroBudget { group: "success" });
        }
        if self.limiter.budget == 0 {
            return Err(ConfigError::ZeroBudget { group: "limiter" });
        }
        if self.timeout.budget == 0 {
            return Err(ConfigError::ZeroBudget { group: "timeout" });
        }
        Ok(())
    }
}

/// Builder for [`BreakerConfig`]
#[derive(Debug, Default)]
pub struct BreakerConfigBuilder {
    config: BreakerConfig,
}

impl BreakerConfigBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts allowed to fail before the action's error is returned
    pub fn failure_budget(mut self, budget: u32) -> Self {
        self.config.failure.budget = budget;
        self
    }

    /// Pause after each counted failure
    pub fn failure_cooler(mut self, cooler: Duration) -> Self {
        self.config.failure.cooler = Some(cooler);
        self
    }

    /// Retry a failed attempt without pausing
    pub fn no_failure_cooler(mut self) -> Self {
        self.config.failure.cooler = None;
        self
    }

    /// Successful attempts required for overall success
    pub fn success_budget(mut self, budget: u32) -> Self {
        self.config.success.budget = budget;
        self
    }

    /// Concurrent and per-window admission limit
    pub fn limiter_budget(mut self, budget: usize) -> Self {
        self.config.limiter.budget = budget;
        self
    }

    /// Enable rate limiting with a rolling window of `window`
    pub fn limiter_window(mut self, window: Duration) -> Self {
        self.config.limiter.cooler = Some(window);
        self
    }

    /// Wait limit for a single attempt
    pub fn action_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout.action = Some(timeout);
        self
    }

    /// Wait for every attempt indefinitely
    pub fn no_action_timeout(mut self) -> Self {
        self.config.timeout.action = None;
        self
    }

    /// Attempt timeouts allowed before giving up with `passed`
    pub fn timeout_budget(mut self, budget: u32) -> Self {
        self.config.timeout.budget = budget;
        self
    }

    /// Pause after each counted attempt timeout
    pub fn timeout_cooler(mut self, cooler: Duration) -> Self {
        self.config.timeout.cooler = Some(cooler);
        self
    }

    /// Hard limit on the whole execution
    pub fn global_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout.global = Some(timeout);
        self
    }

    /// Stop executions with `closed` once `closer` is cancelled
    pub fn closer(mut self, closer: CancellationToken) -> Self {
        self.config.timeout.closer = Some(closer);
        self
    }

    /// Replace the failure group wholesale
    pub fn failure(mut self, failure: FailureConfig) -> Self {
        self.config.failure = failure;
        self
    }

    /// Replace the limiter group wholesale
    pub fn limiter(mut self, limiter: LimiterConfig) -> Self {
        self.config.limiter = limiter;
        self
    }

    /// Replace the timeout group wholesale
    pub fn timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    /// See [`BreakerConfig::validate`].
    pub fn build(self) -> Result<BreakerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config defaults, builder and serde.
    use super::*;

    /// Validates the defaults of every group.
    ///
    /// Assertions:
    /// - Budgets are 3 / 1 / 3 / 1 for failure, success, limiter, timeout.
    /// - Only the failure cooler and the action timeout are enabled.
    #[test]
    fn test_defaults() {
        let config = BreakerConfig::default();

        assert_eq!(config.failure, FailureConfig { budget: 3, cooler: Some(Duration::from_secs(1)) });
        assert_eq!(config.success.budget, 1);
        assert_eq!(config.limiter, LimiterConfig { budget: 3, cooler: None });
        assert_eq!(config.timeout.action, Some(Duration::from_secs(3)));
        assert_eq!(config.timeout.budget, 1);
        assert_eq!(config.timeout.cooler, None);
        assert_eq!(config.timeout.global, None);
        assert!(config.timeout.closer.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sets_every_option() {
        let closer = CancellationToken::new();
        let config = BreakerConfig::builder()
            .failure_budget(7)
            .no_failure_cooler()
            .success_budget(2)
            .limiter_budget(10)
            .limiter_window(Duration::from_millis(250))
            .action_timeout(Duration::from_millis(40))
            .timeout_budget(4)
            .timeout_cooler(Duration::from_millis(5))
            .global_timeout(Duration::from_secs(9))
            .closer(closer.clone())
            .build()
            .unwrap();

        assert_eq!(config.failure, FailureConfig { budget: 7, cooler: None });
        assert_eq!(config.success.budget, 2);
        assert_eq!(config.limiter.cooler, Some(Duration::from_millis(250)));
        assert_eq!(config.timeout.action, Some(Duration::from_millis(40)));
        assert_eq!(config.timeout.budget, 4);
        assert_eq!(config.timeout.cooler, Some(Duration::from_millis(5)));
        assert_eq!(config.timeout.global, Some(Duration::from_secs(9)));

        closer.cancel();
        assert!(config.timeout.closer.unwrap().is_cancelled());
    }

    #[test]
    fn test_builder_rejects_zero_budgets() {
        let cases = [
            (BreakerConfig::builder().failure_budget(0), "failure"),
            (BreakerConfig::builder().success_budget(0), "success"),
            (BreakerConfig::builder().limiter_budget(0), "limiter"),
            (BreakerConfig::builder().timeout_budget(0), "timeout"),
        ];

        for (builder, expected) in cases {
            match builder.build() {
                Err(ConfigError::ZeroBudget { group }) => assert_eq!(group, expected),
                other => panic!("expected zero budget error for {expected}, got {other:?}"),
            }
        }
    }

    /// Validates that partial documents fill in defaults and negative
    /// durations disable a timer.
    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{
            "failure": { "budget": 5 },
            "limiter": { "cooler": 500 },
            "timeout": { "action": -1, "global": 10000 }
        }"#;

        let config: BreakerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.failure.budget, 5);
        assert_eq!(config.failure.cooler, Some(Duration::from_secs(1)));
        assert_eq!(config.limiter.budget, 3);
        assert_eq!(config.limiter.cooler, Some(Duration::from_millis(500)));
        assert_eq!(config.success.budget, 1);
        assert_eq!(config.timeout.action, None);
        assert_eq!(config.timeout.global, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_closer_is_never_serialized() {
        let config = BreakerConfig::builder().closer(CancellationToken::new()).build().unwrap();
        let value = serde_json::to_value(&config).unwrap();

        assert!(value["timeout"].get("closer").is_none());
        assert_eq!(value["timeout"]["cooler"], -1);
        assert_eq!(value["failure"]["cooler"], 1000);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ZeroBudget { group: "limiter" };
        assert_eq!(err.to_string(), "limiter budget must be greater than 0");
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(!err.is_retryable());

        let err = ConfigError::InvalidEnv { key: "BREAKWATER_SUCCESS_BUDGET".into(), value: "x".into() };
        assert_eq!(err.to_string(), "invalid value for BREAKWATER_SUCCESS_BUDGET: \"x\"");
    }
}
