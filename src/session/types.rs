//! Session data types and the on-disk record format
//!
//! Recordings are plain UTF-8 text: a header line with the channel names in
//! configured order, then one line per row with one value per channel.
//!
//! ```text
//! A6,A7
//! 1.0,2.0
//! 1.1,2.1
//! ```

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::format_value;

/// Field separator for the record format
pub const FIELD_SEPARATOR: char = ',';

/// State of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// No output file open
    #[default]
    Idle,
    /// Rows are being written to an open file
    Recording,
}

impl RecorderState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, RecorderState::Recording)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "Idle",
            RecorderState::Recording => "Recording",
        }
    }
}

/// Summary of a finished recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    /// Output file
    pub path: PathBuf,
    /// Data rows written (header excluded)
    pub rows_written: u64,
    /// When the recording started
    pub started_at: chrono::DateTime<chrono::Local>,
    /// How long the recording was active
    pub duration: Duration,
}

/// Per-channel result of a playback load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedChannel {
    /// Channel name
    pub name: String,
    /// Column index in the file, if the header named this channel
    pub column: Option<usize>,
    /// Samples loaded
    pub samples: usize,
    /// Values skipped because they were missing or malformed
    pub skipped: usize,
}

/// Summary of a successful playback load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    /// Source file
    pub path: PathBuf,
    /// Data rows read (blank lines excluded)
    pub rows: usize,
    /// Per-channel results in configured order
    pub channels: Vec<LoadedChannel>,
}

impl LoadSummary {
    /// Total values skipped across all channels
    pub fn skipped_values(&self) -> usize {
        self.channels.iter().map(|c| c.skipped).sum()
    }

    /// Configured channels the file did not contain
    pub fn missing_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.column.is_none())
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Format the header line (no trailing newline)
pub fn format_header(names: &[String]) -> String {
    names.join(&FIELD_SEPARATOR.to_string())
}

/// Format one data row (no trailing newline)
pub fn format_row(values: &[f64]) -> String {
    let mut line = String::with_capacity(values.len() * 8);
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(FIELD_SEPARATOR);
        }
        line.push_str(&format_value(*value));
    }
    line
}
