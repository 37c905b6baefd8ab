//! Configuration management for stageload
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_GENERATED, DEFAULT_FAILURE_EVERY, DEFAULT_JOURNAL_CAPACITY,
    DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS, DEFAULT_TICK_RATE_MS, MAX_JOURNAL_CAPACITY, MAX_SIMULATED_DELAY_MS,
    MAX_TICK_RATE_MS, MIN_TICK_RATE_MS,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
    pub inspector: InspectorConfig,
}

/// Engine behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Drop callbacks issued by an earlier load pass of the same panel
    pub discard_stale_callbacks: bool,
    /// Keep a bounded journal of panel state transitions
    pub record_transitions: bool,
    /// Number of transitions kept in the journal
    pub journal_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging to a file
    pub enabled: bool,
}

/// Inspector (demo binary) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// UI tick rate in milliseconds
    pub tick_rate_ms: u64,
    /// Lower bound of the simulated fetch latency
    pub min_delay_ms: u64,
    /// Upper bound of the simulated fetch latency
    pub max_delay_ms: u64,
    /// Every Nth simulated fetch fails (0 = never)
    pub failure_every: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discard_stale_callbacks: true,
            record_transitions: true,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
        }
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            failure_every: DEFAULT_FAILURE_EVERY,
        }
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Result<Option<PathBuf>> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Ok(Some(current_dir_config));
        }

        // 2. Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join(CONFIG_DIR_NAME).join("config.toml");
            if xdg_config.exists() {
                return Ok(Some(xdg_config));
            }
        }

        Ok(None)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.engine.journal_capacity == 0 || self.engine.journal_capacity > MAX_JOURNAL_CAPACITY {
            anyhow::bail!(
                "journal_capacity must be between 1 and {}, got {}",
                MAX_JOURNAL_CAPACITY,
                self.engine.journal_capacity
            );
        }

        let inspector = &self.inspector;
        if inspector.tick_rate_ms < MIN_TICK_RATE_MS || inspector.tick_rate_ms > MAX_TICK_RATE_MS {
            anyhow::bail!(
                "tick_rate_ms must be between {} and {} milliseconds, got {}",
                MIN_TICK_RATE_MS,
                MAX_TICK_RATE_MS,
                inspector.tick_rate_ms
            );
        }

        if inspector.min_delay_ms > inspector.max_delay_ms {
            anyhow::bail!(
                "min_delay_ms ({}) cannot exceed max_delay_ms ({})",
                inspector.min_delay_ms,
                inspector.max_delay_ms
            );
        }

        if inspector.max_delay_ms > MAX_SIMULATED_DELAY_MS {
            anyhow::bail!("max_delay_ms cannot exceed {} (one minute)", MAX_SIMULATED_DELAY_MS);
        }

        Ok(())
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        let header = format!(
            "# stageload Configuration File\n# Generated on {}\n\n",
            chrono::Local::now().format("%Y-%m-%d")
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join(CONFIG_DIR_NAME))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join("config.toml"))
    }
}
