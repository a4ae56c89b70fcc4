//! Test to verify test infrastructure works correctly

mod common;

use common::builders::ConfigBuilder;
use serialvis_rs::Coordinator;

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let config = ConfigBuilder::new()
        .channels(&["temp", "humidity"])
        .capacity(16)
        .read_timeout_ms(5)
        .build();

    assert_eq!(config.channels.names, vec!["temp", "humidity"]);
    assert_eq!(config.serial.read_timeout_ms, 5);

    let coordinator = Coordinator::with_serial_port(config).unwrap();
    assert_eq!(coordinator.channel_names(), ["temp", "humidity"]);
    assert!(coordinator.snapshot().is_empty());
}

#[test]
fn test_wait_until_times_out() {
    assert!(common::wait_until(|| true));
    assert!(!common::wait_until(|| false));
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
