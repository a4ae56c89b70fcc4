//! Configuration module for SerialVis-RS
//!
//! This module handles application configuration:
//! - Channel layout and buffer capacity
//! - Serial link defaults and timeouts
//! - Recording and render defaults
//!
//! # Config Location
//!
//! The default config file lives in the platform-appropriate config directory
//! under `dev.serialvis.serialvis-rs`:
//!
//! - **Linux**: `~/.config/dev.serialvis.serialvis-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.serialvis.serialvis-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.serialvis.serialvis-rs\config.toml`
//!
//! Files ending in `.json` are read and written as JSON; everything else is TOML.
//!
//! # Example
//!
//! ```ignore
//! use serialvis_rs::config::AppConfig;
//!
//! let config = AppConfig::load("bench.toml")?;
//! config.validate()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, ResultExt, SerialVisError};
use crate::types::is_supported_baud;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.serialvis.serialvis-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "config.toml";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Channel layout
    pub channels: ChannelConfig,
    /// Serial link settings
    pub serial: SerialConfig,
    /// Recording defaults
    pub recording: RecordingConfig,
    /// Render tick settings
    pub render: RenderConfig,
}

impl AppConfig {
    /// Load a config file (TOML, or JSON by extension)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SerialVisError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: AppConfig = match ConfigFormat::for_path(path) {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| {
                SerialVisError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?,
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| {
                SerialVisError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load the default config file, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk (TOML, or JSON by extension)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::for_path(path) {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| SerialVisError::Serialization(e.to_string()))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| SerialVisError::Serialization(e.to_string()))?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {:?}", path))
    }

    /// Check the config for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let names = &self.channels.names;
        if names.is_empty() {
            return Err(SerialVisError::Config(
                "At least one channel must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in names {
            if name.trim().is_empty() {
                return Err(SerialVisError::Config(
                    "Channel names must not be empty".to_string(),
                ));
            }
            if name.trim() != name {
                return Err(SerialVisError::Config(format!(
                    "Channel name {:?} must not start or end with whitespace",
                    name
                )));
            }
            if name.contains(',') {
                return Err(SerialVisError::Config(format!(
                    "Channel name {:?} must not contain a comma",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(SerialVisError::Config(format!(
                    "Duplicate channel name {:?}",
                    name
                )));
            }
        }

        if self.channels.capacity == 0 {
            return Err(SerialVisError::Config(
                "Channel capacity must be at least 1".to_string(),
            ));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(SerialVisError::Config(
                "Read timeout must be greater than zero".to_string(),
            ));
        }
        if self.serial.shutdown_timeout_ms == 0 {
            return Err(SerialVisError::Config(
                "Shutdown timeout must be greater than zero".to_string(),
            ));
        }
        if !is_supported_baud(self.serial.default_baud) {
            return Err(SerialVisError::Config(format!(
                "Unsupported default baud rate {}",
                self.serial.default_baud
            )));
        }
        if self.render.interval_ms == 0 {
            return Err(SerialVisError::Config(
                "Render interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
