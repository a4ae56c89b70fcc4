//! Test data builders for creating test objects

use serialvis_rs::config::{AppConfig, ChannelConfig};

/// Builder for test configurations with fast timeouts
pub struct ConfigBuilder {
    names: Vec<String>,
    capacity: usize,
    read_timeout_ms: u64,
    shutdown_timeout_ms: u64,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            names: vec!["A6".to_string(), "A7".to_string()],
            capacity: 1000,
            read_timeout_ms: 10,
            shutdown_timeout_ms: 1000,
        }
    }

    pub fn channels(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    pub fn build(self) -> AppConfig {
        let mut config = AppConfig {
            channels: ChannelConfig::new(self.names, self.capacity),
            ..AppConfig::default()
        };
        config.serial.read_timeout_ms = self.read_timeout_ms;
        config.serial.shutdown_timeout_ms = self.shutdown_timeout_ms;
        config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .channels(&["x", "y", "z"])
            .capacity(8)
            .build();

        assert_eq!(config.channels.names, vec!["x", "y", "z"]);
        assert_eq!(config.channels.capacity, 8);
        assert_eq!(config.serial.read_timeout_ms, 10);
        assert!(config.validate().is_ok());
    }
}
