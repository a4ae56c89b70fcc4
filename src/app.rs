//! Lifecycle coordinator
//!
//! [`Coordinator`] is the single owner of the acquisition state machine:
//!
//! ```text
//! Disconnected --open--> Connected --pause--> Paused --resume--> Connected
//!      ^                     |                  |
//!      +------- close / device failure ---------+
//! ```
//!
//! It also owns the long-lived buffer store and recorder, so a renderer can
//! keep the handle from [`Coordinator::store`] across reconnects and
//! playback loads.

use crate::backend::{
    AcquisitionSession, DeviceConnector, SerialPortConnector, SessionEvent,
    SessionStatsSnapshot, EVENT_QUEUE_SIZE,
};
use crate::config::AppConfig;
use crate::error::{Result, SerialVisError};
use crate::session::{
    lock_recorder, LoadSummary, PlaybackLoader, Recorder, RecordingSummary, SharedRecorder,
};
use crate::store::{ChannelBufferStore, SharedBufferStore, Snapshot};
use crate::types::SessionState;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::{Path, PathBuf};

/// Connect/pause/disconnect state machine around an [`AcquisitionSession`]
pub struct Coordinator {
    config: AppConfig,
    connector: Box<dyn DeviceConnector>,
    store: SharedBufferStore,
    recorder: SharedRecorder,
    loader: PlaybackLoader,
    session: Option<AcquisitionSession>,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
}

impl Coordinator {
    /// Create a coordinator that opens devices through `connector`
    pub fn new(config: AppConfig, connector: Box<dyn DeviceConnector>) -> Result<Self> {
        config.validate()?;

        let names = config.channels.names.clone();
        let store = ChannelBufferStore::shared(names.clone(), config.channels.capacity);
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_SIZE);

        Ok(Self {
            config,
            connector,
            store,
            recorder: Recorder::shared(),
            loader: PlaybackLoader::new(names),
            session: None,
            event_tx,
            event_rx,
        })
    }

    /// Create a coordinator for real serial ports
    pub fn with_serial_port(config: AppConfig) -> Result<Self> {
        Self::new(config, Box::new(SerialPortConnector))
    }

    /// Current lifecycle state
    ///
    /// A session whose read loop has failed already reads as Disconnected.
    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(session) if session.has_failed() || !session.is_running() => {
                SessionState::Disconnected
            }
            Some(session) if session.is_paused() => SessionState::Paused,
            Some(_) => SessionState::Connected,
            None => SessionState::Disconnected,
        }
    }

    /// Release a session whose read loop is gone
    fn reconcile(&mut self) {
        let ended = self
            .session
            .as_ref()
            .is_some_and(|s| s.has_failed() || !s.is_running());
        if !ended {
            return;
        }
        if let Some(mut session) = self.session.take() {
            tracing::warn!("Session on {} ended, now disconnected", session.address());
            session.close();
        }
    }

    /// Open a device and start acquiring
    ///
    /// All channel buffers are cleared before the first new sample.
    pub fn open(&mut self, address: &str, baud: u32) -> Result<()> {
        self.reconcile();
        if let Some(session) = &self.session {
            return Err(SerialVisError::AlreadyConnected(session.address().to_string()));
        }

        let session = AcquisitionSession::open(
            self.connector.as_ref(),
            address,
            baud,
            &self.config.serial,
            self.store.clone(),
            self.recorder.clone(),
            self.event_tx.clone(),
        )?;
        self.session = Some(session);
        Ok(())
    }

    /// Stop applying incoming rows; no-op unless Connected
    pub fn pause(&mut self) {
        self.reconcile();
        if let Some(session) = &self.session {
            if !session.is_paused() {
                session.pause();
                tracing::info!("Acquisition paused");
            }
        }
    }

    /// Resume applying incoming rows; no-op unless Paused
    pub fn resume(&mut self) {
        self.reconcile();
        if let Some(session) = &self.session {
            if session.is_paused() {
                session.resume();
                tracing::info!("Acquisition resumed");
            }
        }
    }

    /// Stop any recording and close the device
    ///
    /// Always succeeds and may be called in any state.
    pub fn close(&mut self) {
        match self.stop_recording() {
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to finish recording on close: {}", e),
        }
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    /// Start recording accepted rows to `path`
    ///
    /// Requires a live session. Fails with `AlreadyRecording` while a
    /// recording is active; the active one keeps running.
    pub fn start_recording(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.reconcile();
        if !self.state().is_live() {
            return Err(SerialVisError::InvalidState(
                "Recording requires an open device".to_string(),
            ));
        }
        lock_recorder(&self.recorder).start(path, self.store.channel_names())
    }

    /// Start recording to a timestamped file from the recording config
    pub fn start_recording_auto(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.config.recording.directory {
            std::fs::create_dir_all(dir).map_err(|e| {
                SerialVisError::RecordingIo(format!(
                    "Failed to create recording directory {:?}: {}",
                    dir, e
                ))
            })?;
        }
        let path = self.config.recording.timestamped_path();
        self.start_recording(&path)?;
        Ok(path)
    }

    /// Finish the active recording, if any
    pub fn stop_recording(&mut self) -> Result<Option<RecordingSummary>> {
        lock_recorder(&self.recorder).stop()
    }

    /// Check if a recording is active
    pub fn is_recording(&self) -> bool {
        lock_recorder(&self.recorder).is_recording()
    }

    /// Path of the active recording
    pub fn recording_path(&self) -> Option<PathBuf> {
        lock_recorder(&self.recorder).path().map(Path::to_path_buf)
    }

    /// Replace the buffers with the contents of a recording
    ///
    /// Only allowed while Disconnected. On failure the buffers are unchanged.
    pub fn load_playback(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        self.reconcile();
        if let Some(session) = &self.session {
            return Err(SerialVisError::InvalidState(format!(
                "Cannot load a recording while connected to {}",
                session.address()
            )));
        }
        self.loader.load(path, &self.store)
    }

    /// Consistent copy of every channel buffer
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Shared handle to the buffer store, valid for the coordinator's lifetime
    pub fn store(&self) -> SharedBufferStore {
        self.store.clone()
    }

    /// Drain pending session events
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        self.reconcile();
        self.event_rx.try_iter().collect()
    }

    /// Counters of the live session
    pub fn stats(&self) -> Option<SessionStatsSnapshot> {
        self.session.as_ref().map(AcquisitionSession::stats)
    }

    /// Address of the live session
    pub fn address(&self) -> Option<&str> {
        self.session.as_ref().map(AcquisitionSession::address)
    }

    /// Active configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Configured channel names in order
    pub fn channel_names(&self) -> &[String] {
        self.store.channel_names()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.close();
    }
}
