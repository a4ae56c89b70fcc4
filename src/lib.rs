//! # SerialVis-RS: Serial Multi-Channel Data Visualizer
//!
//! A real-time acquisition engine for microcontrollers that print comma-separated
//! readings over a serial port, one line per sample row. Each column is a named
//! channel; the most recent N samples of every channel are kept in rolling buffers
//! that a renderer can snapshot at any time.
//!
//! ## Architecture
//!
//! - **Backend**: device traits, the serial and mock devices, and the per-session
//!   read loop thread
//! - **Store**: bounded rolling buffers shared between the read loop and renderers
//! - **Session**: recording accepted rows to disk and loading recordings back
//! - **Coordinator**: the connect/pause/disconnect state machine tying it together
//! - **Communication**: atomic flags plus a bounded crossbeam event channel
//!
//! ## Configuration
//!
//! The configuration file is stored in the platform config directory under
//! `dev.serialvis.serialvis-rs`:
//!
//! - **Linux**: `~/.config/dev.serialvis.serialvis-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.serialvis.serialvis-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.serialvis.serialvis-rs\config.toml`
//!
//! ## Example
//!
//! ```ignore
//! use serialvis_rs::{AppConfig, Coordinator};
//!
//! let mut coordinator = Coordinator::with_serial_port(AppConfig::load_or_default())?;
//! coordinator.open("/dev/ttyACM0", 115200)?;
//!
//! let store = coordinator.store();
//! std::thread::spawn(move || loop {
//!     let snapshot = store.snapshot();
//!     // draw snapshot.channels ...
//!     std::thread::sleep(std::time::Duration::from_millis(20));
//! });
//!
//! coordinator.start_recording("run.csv")?;
//! // ...
//! coordinator.close();
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use app::Coordinator;
pub use backend::{AcquisitionSession, DeviceConnector, SerialDevice, SessionEvent};
pub use config::AppConfig;
pub use error::{Result, ResultExt, SerialVisError};
pub use session::{LoadSummary, PlaybackLoader, Recorder, RecordingSummary};
pub use store::{ChannelBufferStore, ChannelSnapshot, SharedBufferStore, Snapshot};
pub use types::{SampleRow, SessionState};
