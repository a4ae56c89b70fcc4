//! Configuration sections
//!
//! Each section is a plain serde struct with defaults, so a partial config
//! file only needs to name the values it changes.
//!
//! # Main Types
//!
//! - [`ChannelConfig`] - Channel names and per-channel buffer capacity
//! - [`SerialConfig`] - Baud rate and read/shutdown timeouts
//! - [`RecordingConfig`] - Where recordings go when no file is named
//! - [`RenderConfig`] - Render tick cadence

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::DEFAULT_CAPACITY;
use crate::types::DEFAULT_BAUD_RATE;

/// Default read timeout in milliseconds (bounds shutdown latency)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Default time `close` waits for the read loop to exit
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1000;

/// Default render tick interval (~50 Hz)
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 20;

/// Channel layout shared by acquisition, recording and playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel names, in the order values appear on each line
    pub names: Vec<String>,
    /// Samples retained per channel during live acquisition
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            names: vec!["A6".to_string(), "A7".to_string()],
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ChannelConfig {
    /// Create a channel config from names and capacity
    pub fn new<I, S>(names: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            capacity,
        }
    }

    /// Number of channels
    pub fn count(&self) -> usize {
        self.names.len()
    }
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate used when none is given explicitly
    pub default_baud: u32,
    /// Per-read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Maximum time to wait for the read loop on close, in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Shutdown timeout as a duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Recording defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory for auto-named recordings (current directory if unset)
    pub directory: Option<PathBuf>,
    /// File name prefix for auto-named recordings
    pub file_prefix: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "recording".to_string(),
        }
    }
}

impl RecordingConfig {
    /// Build a timestamped recording path, e.g. `recording_20240131_154501.csv`
    pub fn timestamped_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let file_name = format!("{}_{}.csv", self.file_prefix, stamp);
        match &self.directory {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Render tick settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Interval between snapshots in milliseconds
    pub interval_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_RENDER_INTERVAL_MS,
        }
    }
}

impl RenderConfig {
    /// Render interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let channels = ChannelConfig::default();
        assert_eq!(channels.names, vec!["A6", "A7"]);
        assert_eq!(channels.count(), 2);

        let serial = SerialConfig::default();
        assert_eq!(serial.default_baud, 9600);
        assert_eq!(serial.read_timeout(), Duration::from_millis(100));

        assert_eq!(RenderConfig::default().interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_timestamped_path() {
        let config = RecordingConfig {
            directory: Some(PathBuf::from("/tmp/logs")),
            file_prefix: "pot_data".to_string(),
        };
        let path = config.timestamped_path();
        assert!(path.starts_with("/tmp/logs"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pot_data_"));
        assert!(name.ends_with(".csv"));
    }
}
