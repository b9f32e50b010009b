//! Configuration management
//!
//! Retry and backend settings are read from `config.toml` in the s3fs config
//! directory. `S3FS_CONFIG_DIR` overrides the platform default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_DIR_ENV: &str = "S3FS_CONFIG_DIR";
const CONFIG_FILE: &str = "config.toml";

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Factor the delay grows by per retry
    pub backoff_growth: f64,
    /// Upper bound on a single delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 100,
            backoff_growth: 1.7,
            max_delay_ms: 15_000,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(self.backoff_growth >= 1.0 && self.backoff_growth.is_finite()) {
            return Err(Error::Config(format!(
                "retry.backoff_growth must be a finite number >= 1, got {}",
                self.backoff_growth
            )));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Connection settings for the S3 backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Options {
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`)
    pub force_path_style: bool,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub s3: S3Options,
}

/// Loads and saves the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Resolve the config file location from the environment
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".into()))?
                .join("s3fs"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, falling back to defaults if the file is absent
    pub fn load(&self) -> Result<Config> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "failed to read {}: {e}",
                    self.config_path.display()
                )));
            }
        };

        let config: Config = toml::from_str(&content)?;
        config.retry.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.retry.validate()?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content).map_err(|e| {
            Error::Config(format!("failed to write {}: {e}", self.config_path.display()))
        })
    }
}
