//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/minilabo/config.toml)
//! 3. Environment variables (MINILABO_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix
const ENV_PREFIX: &str = "MINILABO";

/// Directory (under the data dir) holding one JSON file per area
pub const CONFIGURATION_DIR: &str = "configuration";

/// Directory (under the data dir) holding the durable log files
pub const LOGS_DIR: &str = "logs";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the emulated flash filesystem
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Host-side tracing output (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Area store timing
    #[serde(default)]
    pub store: StoreSettings,

    /// Ring logger sizing and flush policy
    #[serde(default)]
    pub log: LogSettings,
}

/// Debounce and write-rate settings for the area store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Idle time after the last `request_save` before a write may fire
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum spacing between any two physical writes, across all areas
    #[serde(default = "default_min_period_ms")]
    pub min_period_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_period_ms: default_min_period_ms(),
        }
    }
}

/// Ring logger settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Number of entries kept in RAM
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,

    /// Period between two flushes of the ring to disk
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Size above which the current log file is rotated
    #[serde(default = "default_file_max_size")]
    pub file_max_size: u64,

    /// What each flush writes
    #[serde(default)]
    pub flush_mode: FlushMode,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            ring_capacity: default_ring_capacity(),
            flush_interval_ms: default_flush_interval_ms(),
            file_max_size: default_file_max_size(),
            flush_mode: FlushMode::default(),
        }
    }
}

/// What a log flush appends to the current file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// Every valid ring entry, on every flush. Lines repeat across flushes.
    #[default]
    Full,
    /// Only entries logged since the previous flush
    Incremental,
}

impl FromStr for FlushMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(FlushMode::Full),
            "incremental" => Ok(FlushMode::Incremental),
            other => bail!("Unknown flush mode '{}'. Use 'full' or 'incremental'.", other),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_file: None,
            store: StoreSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MINILABO_DATA_DIR, MINILABO_DEBOUNCE_MS, ...)
    /// 2. Config file (~/.config/minilabo/config.toml or MINILABO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Configuration rooted at `data_dir` with every other value defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // MINILABO_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // MINILABO_DEBOUNCE_MS
        if let Ok(val) = std::env::var(format!("{}_DEBOUNCE_MS", ENV_PREFIX)) {
            self.store.debounce_ms = val
                .parse()
                .with_context(|| format!("Invalid {}_DEBOUNCE_MS: '{}'", ENV_PREFIX, val))?;
        }

        // MINILABO_MIN_PERIOD_MS
        if let Ok(val) = std::env::var(format!("{}_MIN_PERIOD_MS", ENV_PREFIX)) {
            self.store.min_period_ms = val
                .parse()
                .with_context(|| format!("Invalid {}_MIN_PERIOD_MS: '{}'", ENV_PREFIX, val))?;
        }

        // MINILABO_FLUSH_MODE
        if let Ok(val) = std::env::var(format!("{}_FLUSH_MODE", ENV_PREFIX)) {
            self.log.flush_mode = val.parse()?;
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MINILABO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minilabo")
            .join("config.toml")
    }

    /// Directory holding the area files
    pub fn configuration_dir(&self) -> PathBuf {
        self.data_dir.join(CONFIGURATION_DIR)
    }

    /// Canonical file of an area
    pub fn area_path(&self, area: &str) -> PathBuf {
        self.configuration_dir().join(format!("{}.json", area))
    }

    /// Directory holding the log files
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join(LOGS_DIR)
    }

    /// The log file flushes append to
    pub fn current_log_path(&self) -> PathBuf {
        self.logs_dir().join("log_current.log")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("minilabo")
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_min_period_ms() -> u64 {
    2000
}

fn default_ring_capacity() -> usize {
    200
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_file_max_size() -> u64 {
    65536
}
