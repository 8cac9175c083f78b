use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{PolicyError, RetryPolicy};

/// Retry policy parameters (`[retry]` section in config.toml).
///
/// Every field is optional in the file; missing ones take the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Factor applied to the delay after every retry (must be > 1).
    pub backoff_multiplier: f64,
    /// Ceiling on any single backoff delay, in seconds.
    pub max_delay_secs: u64,
    /// Extra random delay as a fraction of the computed delay (0 disables).
    pub jitter: f64,
    /// Per-attempt timeout in milliseconds; absent means attempts are unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_secs: 30,
            jitter: 0.0,
            attempt_timeout_ms: None,
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(cfg: &RetryConfig) -> Result<Self, Self::Error> {
        let mut policy = RetryPolicy::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.base_delay_ms),
            cfg.backoff_multiplier,
        )?
        .with_max_delay(Duration::from_secs(cfg.max_delay_secs))?
        .with_jitter(cfg.jitter)?;
        if let Some(ms) = cfg.attempt_timeout_ms {
            policy = policy.with_attempt_timeout(Duration::from_millis(ms))?;
        }
        Ok(policy)
    }
}

/// Global configuration loaded from `~/.config/inflight/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InflightConfig {
    /// Default retry policy for coordinators built from this config.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl InflightConfig {
    /// Validated retry policy described by the `[retry]` section.
    pub fn retry_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::try_from(&self.retry)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("inflight")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<InflightConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = InflightConfig::default();
        let toml = to_toml(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Render a config the way it is written to disk.
pub fn to_toml(cfg: &InflightConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Load and validate configuration from a specific file.
pub fn load_from(path: &Path) -> Result<InflightConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg: InflightConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.retry_policy()
        .with_context(|| format!("invalid [retry] section in {}", path.display()))?;
    Ok(cfg)
}
