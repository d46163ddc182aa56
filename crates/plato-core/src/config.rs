use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on concurrent workers per batch unless overridden.
pub const DEFAULT_MAX_POOL_SIZE: usize = 10;

/// Invalid fetch configuration. Fatal for the whole batch.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("retry config requires all parameters to be positive: {0}")]
    Retry(&'static str),
    #[error("timeout config requires all parameters to be positive: {0}")]
    Timeout(&'static str),
    #[error("max_pool_size must be at least 1")]
    PoolSize,
}

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per URL (including the first).
    pub attempts: u32,
    /// Relative jitter applied to each backoff wait (0.1 = +/-10%).
    pub jitter: f64,
    /// Backoff base in milliseconds; the wait before attempt n is factor * 2^n.
    pub factor_ms: u64,
    /// Ceiling in seconds on any single backoff wait.
    pub max_timeout_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            jitter: 0.1,
            factor_ms: 100,
            max_timeout_secs: 10.0,
        }
    }
}

impl RetryConfig {
    pub fn factor(&self) -> Duration {
        Duration::from_millis(self.factor_ms)
    }

    pub fn max_timeout(&self) -> Duration {
        secs(self.max_timeout_secs)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::Retry("attempts"));
        }
        if !(self.jitter > 0.0 && self.jitter <= 1.0) {
            return Err(ConfigError::Retry("jitter"));
        }
        if self.factor_ms == 0 {
            return Err(ConfigError::Retry("factor"));
        }
        if self.max_timeout().is_zero() {
            return Err(ConfigError::Retry("max_timeout"));
        }
        Ok(())
    }
}

/// Connect and whole-request timeouts (`[timeouts]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_timeout_secs: f64,
    pub request_timeout_secs: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5.0,
            request_timeout_secs: 10.0,
        }
    }
}

impl TimeoutConfig {
    pub fn connect_timeout(&self) -> Duration {
        secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_secs)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.connect_timeout().is_zero() {
            return Err(ConfigError::Timeout("connect_timeout"));
        }
        if self.request_timeout().is_zero() {
            return Err(ConfigError::Timeout("request_timeout"));
        }
        Ok(())
    }
}

/// Global configuration loaded from `~/.config/plato/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
    /// Ceiling on concurrent workers; a batch uses min(urls, max_pool_size).
    pub max_pool_size: usize,
    /// Dump every request and response to the diagnostic sink.
    pub debug: bool,
    /// Skip TLS certificate and host verification.
    pub insecure_tls: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            debug: false,
            insecure_tls: false,
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeouts.check()?;
        self.retry.check()?;
        if self.max_pool_size == 0 {
            return Err(ConfigError::PoolSize);
        }
        Ok(())
    }
}

/// Negative, NaN and out-of-range values map to zero so `check` rejects them.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("plato")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetcherConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetcherConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file; missing keys take default values.
pub fn load_from_path(path: &Path) -> Result<FetcherConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: FetcherConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
