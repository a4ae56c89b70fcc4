//! Session recording and playback module
//!
//! This module provides functionality for recording live acquisition to a
//! log file and loading it back later for review.
//!
//! # Features
//!
//! - Mirror accepted rows to a comma-separated log while recording
//! - Independent start/stop lifecycle, unaffected by pause
//! - Load a saved log wholesale, matching columns by channel name
//! - Failed loads never modify the buffers

pub mod player;
pub mod recorder;
pub mod types;

pub use player::{LoadedRecording, PlaybackLoader};
pub use recorder::{lock_recorder, Recorder, SharedRecorder};
pub use types::{LoadSummary, LoadedChannel, RecorderState, RecordingSummary};
