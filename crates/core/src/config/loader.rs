//! Configuration loader
//!
//! Loads a [`BreakerConfig`] from files and environment variables.
//!
//! ## Loading Strategy
//! 1. Probe the standard locations for a config file; use defaults if none
//!    exists
//! 2. Apply `BREAKWATER_*` environment variable overrides on top
//! 3. Validate the result
//!
//! ## Environment Variables
//! Durations are milliseconds; a negative value disables the timer.
//! - `BREAKWATER_FAILURE_BUDGET`, `BREAKWATER_FAILURE_COOLER_MS`
//! - `BREAKWATER_SUCCESS_BUDGET`
//! - `BREAKWATER_LIMITER_BUDGET`, `BREAKWATER_LIMITER_COOLER_MS`
//! - `BREAKWATER_TIMEOUT_ACTION_MS`, `BREAKWATER_TIMEOUT_BUDGET`,
//!   `BREAKWATER_TIMEOUT_COOLER_MS`, `BREAKWATER_TIMEOUT_GLOBAL_MS`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./breakwater.json` or `./breakwater.toml` (current working directory)
//! 2. `../breakwater.json` or `../breakwater.toml` (parent directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::{BreakerConfig, ConfigError};

const FILE_NAMES: [&str; 2] = ["breakwater.json", "breakwater.toml"];

/// Load configuration from the first config file found, then apply
/// environment overrides
///
/// Missing files are not an error: the defaults are used instead.
///
/// # Errors
/// Returns [`ConfigError`] if a found file cannot be read or parsed, an
/// environment variable holds an invalid value, or the result fails
/// validation.
pub fn load() -> Result<BreakerConfig, ConfigError> {
    let base = match probe_config_paths() {
        Some(path) => read_config(&path)?,
        None => {
            tracing::debug!("No config file found, starting from defaults");
            BreakerConfig::default()
        }
    };

    let config = apply_env(base)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables on top of the defaults
///
/// Unset variables keep their default value.
///
/// # Errors
/// Returns [`ConfigError::InvalidEnv`] for unparsable values and
/// [`ConfigError::ZeroBudget`] if an override sets a budget to zero.
pub fn load_from_env() -> Result<BreakerConfig, ConfigError> {
    let config = apply_env(BreakerConfig::default())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. JSON and TOML are
/// supported, detected by file extension. Missing fields take defaults.
///
/// # Errors
/// Returns [`ConfigError`] if the file is missing, unreadable, malformed or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<BreakerConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p));
            }
            p
        }
        None => probe_config_paths().ok_or(ConfigError::NoConfigFile)?,
    };

    let config = read_config(&config_path)?;
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<BreakerConfig, ConfigError> {
    tracing::info!(path = %path.display(), "Loading breaker configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

    parse_config(&contents, path)
}

/// Parse configuration text, choosing the format by the extension of `path`
fn parse_config(contents: &str, path: &Path) -> Result<BreakerConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents)?),
        "json" => Ok(serde_json::from_str(contents)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing candidate.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter().flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name))).find(|p| p.exists())
}

fn apply_env(mut config: BreakerConfig) -> Result<BreakerConfig, ConfigError> {
    if let Some(budget) = env_parse("BREAKWATER_FAILURE_BUDGET")? {
        config.failure.budget = budget;
    }
    if let Some(cooler) = env_millis("BREAKWATER_FAILURE_COOLER_MS")? {
        config.failure.cooler = cooler;
    }
    if let Some(budget) = env_parse("BREAKWATER_SUCCESS_BUDGET")? {
        config.success.budget = budget;
    }
    if let Some(budget) = env_parse("BREAKWATER_LIMITER_BUDGET")? {
        config.limiter.budget = budget;
    }
    if let Some(cooler) = env_millis("BREAKWATER_LIMITER_COOLER_MS")? {
        config.limiter.cooler = cooler;
    }
    if let Some(action) = env_millis("BREAKWATER_TIMEOUT_ACTION_MS")? {
        config.timeout.action = action;
    }
    if let Some(budget) = env_parse("BREAKWATER_TIMEOUT_BUDGET")? {
        config.timeout.budget = budget;
    }
    if let Some(cooler) = env_millis("BREAKWATER_TIMEOUT_COOLER_MS")? {
        config.timeout.cooler = cooler;
    }
    if let Some(global) = env_millis("BREAKWATER_TIMEOUT_GLOBAL_MS")? {
        config.timeout.global = global;
    }
    Ok(config)
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns [`ConfigError::InvalidEnv`] if the variable is set but does not
/// parse.
fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key: key.to_string(), value: raw }),
        Err(_) => Ok(None),
    }
}

/// Parse an optional millisecond duration where negative means disabled
fn env_millis(key: &str) -> Result<Option<Option<Duration>>, ConfigError> {
    let millis: Option<i64> = env_parse(key)?;
    Ok(millis.map(|ms| u64::try_from(ms).ok().map(Duration::from_millis)))
}
