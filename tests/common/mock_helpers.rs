//! Mock construction helpers

#[cfg(feature = "mock-device")]
use serialvis_rs::backend::{MockConnector, MockFeed};
#[cfg(feature = "mock-device")]
use serialvis_rs::{AppConfig, Coordinator};

/// Create a coordinator over a scripted mock device
///
/// The feed must be kept alive; dropping it fails the device.
#[cfg(feature = "mock-device")]
pub fn create_test_coordinator(config: AppConfig) -> (Coordinator, MockConnector, MockFeed) {
    let (connector, feed) = MockConnector::scripted();
    let coordinator = Coordinator::new(config, Box::new(connector.clone()))
        .expect("test config should be valid");
    (coordinator, connector, feed)
}

/// Wait until the coordinator's store has seen `rows` rows since the last clear
#[cfg(feature = "mock-device")]
pub fn wait_for_rows(coordinator: &Coordinator, rows: u64) -> bool {
    super::wait_until(|| coordinator.snapshot().total_rows >= rows)
}
