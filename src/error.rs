//! Error handling for the SerialVis-RS application
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the application.
//!
//! Soft per-line parse failures are not represented here; they are
//! [`crate::types::LineError`] values that never leave the read loop.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for SerialVis-RS operations
#[derive(Error, Debug)]
pub enum SerialVisError {
    /// The device could not be opened (not found, busy, permission denied,
    /// or an invalid address/baud rate was requested)
    #[error("Failed to connect to '{address}': {reason}")]
    Connect { address: String, reason: String },

    /// Fatal I/O failure while reading from an open device
    #[error("Device I/O error: {0}")]
    DeviceIo(String),

    /// Failure opening or writing the recording log
    #[error("Recording error: {0}")]
    RecordingIo(String),

    /// Failure loading a recording for playback
    #[error("Failed to load {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// `open` was requested while a session is live
    #[error("Already connected to '{0}'")]
    AlreadyConnected(String),

    /// `start` was requested while a recording is active
    #[error("Already recording to {0:?}")]
    AlreadyRecording(PathBuf),

    /// Operation not permitted in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SerialVisError>,
    },
}

impl SerialVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SerialVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a connect error for an address
    pub fn connect(address: impl Into<String>, reason: impl Into<String>) -> Self {
        SerialVisError::Connect {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a load error for a path
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SerialVisError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a state-machine misuse (no side effects happened)
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            SerialVisError::AlreadyConnected(_)
                | SerialVisError::AlreadyRecording(_)
                | SerialVisError::InvalidState(_)
        )
    }
}

/// Result type alias for SerialVis-RS operations
pub type Result<T> = std::result::Result<T, SerialVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SerialVisError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SerialVisError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SerialVisError::connect("/dev/ttyUSB0", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to connect to '/dev/ttyUSB0': No such file or directory"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = SerialVisError::RecordingIo("disk full".to_string());
        let with_ctx = err.with_context("Failed to write row");
        assert!(with_ctx.to_string().contains("Failed to write row"));
        assert!(with_ctx.to_string().contains("disk full"));
    }

    #[test]
    fn test_load_error_includes_path() {
        let err = SerialVisError::load("missing.csv", "not found");
        assert!(err.to_string().contains("missing.csv"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_state_errors() {
        assert!(SerialVisError::AlreadyConnected("COM3".into()).is_state_error());
        assert!(SerialVisError::AlreadyRecording("a.csv".into()).is_state_error());
        assert!(SerialVisError::InvalidState("connected".into()).is_state_error());
        assert!(!SerialVisError::DeviceIo("unplugged".into()).is_state_error());
    }

    #[test]
    fn test_io_result_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("Opening log").unwrap_err();
        assert!(err.to_string().starts_with("Opening log"));
    }
}
