//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store backend configuration
    pub store: StoreConfig,

    /// Per-call deadlines
    pub timeouts: TimeoutConfig,

    /// Retry policy for idempotent calls
    pub retry: RetryConfig,

    /// Conditional insert behaviour
    pub conditional: ConditionalConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.read_ms == 0 || self.timeouts.write_ms == 0 {
            return Err(eyre::eyre!("Timeouts must be greater than zero"));
        }
        if self.store.table.is_empty() {
            return Err(eyre::eyre!("Store table name must not be empty"));
        }
        self.logging
            .level
            .parse::<tracing::Level>()
            .map_err(|_| eyre::eyre!("Unknown log level: {}", self.logging.level))?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .mediaprogress.yml
        let local_config = PathBuf::from(".mediaprogress.yml");
        if local_config.exists() {
            return Self::load_from_file(&local_config)
                .context(format!("Failed to load config from {}", local_config.display()));
        }

        // Try user config: ~/.config/mediaprogress/mediaprogress.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mediaprogress").join("mediaprogress.yml");
            if user_config.exists() {
                return Self::load_from_file(&user_config)
                    .context(format!("Failed to load config from {}", user_config.display()));
            }
        }

        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

/// Which store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// SQLite file shared between runs
    #[default]
    Sqlite,
    /// In-process store, lost on exit
    Memory,
}

/// Store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file for the SQLite backend
    pub path: PathBuf,

    /// Table holding progress rows
    pub table: String,

    /// Application profile reported in logs
    #[serde(rename = "app-profile")]
    pub app_profile: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mediaprogress")
                .join("store.db"),
            table: "media_progress".to_string(),
            app_profile: "default".to_string(),
        }
    }
}

/// Per-call deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(rename = "read-ms")]
    pub read_ms: u64,

    #[serde(rename = "write-ms")]
    pub write_ms: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_ms: 1000,
            write_ms: 1000,
        }
    }
}

/// Retry policy for transient store errors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each attempt
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
        }
    }
}

/// Lower bound used by the conditional insert's `event_at` range check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalGuard {
    /// Skip the write if the stored `event_at` is at or after the current time
    #[default]
    Now,
    /// Skip the write if the stored `event_at` is at or after the incoming record's
    Record,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionalConfig {
    pub guard: ConditionalGuard,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    #[default]
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,

    /// Minimum level: trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}
