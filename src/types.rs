//! Core data types for SerialVis-RS
//!
//! This module contains the fundamental data structures used throughout
//! the application for representing channels, sample rows and the
//! acquisition lifecycle.
//!
//! # Main Types
//!
//! - [`SessionState`] - Lifecycle state of the acquisition session
//! - [`SampleRow`] - One synchronized set of values, one per channel
//! - [`LineError`] - Soft parse failure for a single input line
//!
//! # Line Format
//!
//! Devices print one line per sample, with one comma-separated value per
//! channel in configured order:
//!
//! ```text
//! 1.23,4.56
//! 1.24,4.55
//! ```
//!
//! A line is accepted only if it has exactly one field per channel and every
//! field parses as an `f64`. Anything else is discarded as a whole.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Baud rates accepted by `open`
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    300, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Check whether a baud rate is supported
pub fn is_supported_baud(baud: u32) -> bool {
    SUPPORTED_BAUD_RATES.contains(&baud)
}

/// Lifecycle state of the acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No device is open
    #[default]
    Disconnected,
    /// Device open, rows flow into the buffers
    Connected,
    /// Device open, parsed rows are dropped
    Paused,
}

impl SessionState {
    /// Check if a device is open (connected or paused)
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        matches!(self, SessionState::Paused)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connected => "Connected",
            SessionState::Paused => "Paused",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One synchronized set of parsed values, one per channel
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow(Vec<f64>);

impl SampleRow {
    /// Create a row from values in channel order
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Values in channel order
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of values in the row
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the row has no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the row, returning its values
    pub fn into_values(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for SampleRow {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Reason a line was discarded by the read loop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Line was not valid UTF-8
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
    /// Line was empty after trimming
    #[error("empty line")]
    Empty,
    /// Number of comma-separated fields differs from the channel count
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    /// A field could not be parsed as a number
    #[error("field {index} ({field:?}) is not a number")]
    InvalidField { index: usize, field: String },
}

/// Parse a text line into a row of `channel_count` values
///
/// Surrounding whitespace is trimmed from the line and from each field. The
/// row is all-or-nothing: a single bad field rejects the entire line.
pub fn parse_line(line: &str, channel_count: usize) -> Result<SampleRow, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineError::Empty);
    }

    let found = line.split(',').count();
    if found != channel_count {
        return Err(LineError::FieldCount {
            expected: channel_count,
            found,
        });
    }

    let mut values = Vec::with_capacity(channel_count);
    for (index, field) in line.split(',').enumerate() {
        let field = field.trim();
        match field.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => {
                return Err(LineError::InvalidField {
                    index,
                    field: field.to_string(),
                })
            }
        }
    }

    Ok(SampleRow(values))
}

/// Decode raw device bytes and parse them as a row
pub fn parse_line_bytes(bytes: &[u8], channel_count: usize) -> Result<SampleRow, LineError> {
    let text = std::str::from_utf8(bytes).map_err(|_| LineError::InvalidUtf8)?;
    parse_line(text, channel_count)
}

/// Format a value the way it is stored in recordings (`1.0`, `2.5`, `NaN`)
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}
