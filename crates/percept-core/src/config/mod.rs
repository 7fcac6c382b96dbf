//! Configuration management for Percept.
//!
//! Configuration is loaded from `~/.percept/config.toml` with sensible
//! defaults. Every section implements `Default` and deserializes with
//! `#[serde(default)]`, so a partial file is always valid.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Percept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tag selection settings
    pub tagging: TaggingConfig,

    /// Hub detection settings
    pub hub: HubConfig,

    /// Scan scheduler settings
    pub scheduler: SchedulerConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,

    /// Retry policy for transient provider failures
    pub retry: RetryConfig,

    /// Concept catalog location
    pub catalog: CatalogConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.percept.percept/config.toml
    /// - Linux: ~/.config/percept/config.toml
    ///
    /// Falls back to ~/.percept/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "percept", "percept")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".percept").join("config.toml")
            })
    }

    /// Get the resolved catalog file path (with ~ expansion).
    pub fn catalog_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.catalog.path);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
