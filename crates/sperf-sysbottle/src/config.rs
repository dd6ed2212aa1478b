//! Analysis thresholds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default CPU busy threshold in percent.
pub const DEFAULT_CPU_THRESHOLD: f64 = 50.0;
/// Default iowait threshold in percent.
pub const DEFAULT_IOWAIT_THRESHOLD: f64 = 5.0;
/// Default disk queue depth threshold.
pub const DEFAULT_QUEUE_THRESHOLD: f64 = 1.0;
/// Default share of busy intervals, in percent, before a resource counts as busy.
pub const DEFAULT_BUSY_THRESHOLD: f64 = 5.0;

/// Configuration for a sysbottle analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysbottleConfig {
    /// `%user + %system + %nice + %steal` above this is CPU bound.
    pub cpu_threshold: f64,
    /// `%iowait` above this is IO bound.
    pub iowait_threshold: f64,
    /// Queue depth at or above this marks a device busy for the interval.
    pub queue_threshold: f64,
    /// Devices to include; empty includes every device.
    pub devices: BTreeSet<String>,
    /// Share of intervals at which a resource is reported as busy.
    pub busy_threshold: f64,
}

impl Default for SysbottleConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
            iowait_threshold: DEFAULT_IOWAIT_THRESHOLD,
            queue_threshold: DEFAULT_QUEUE_THRESHOLD,
            devices: BTreeSet::new(),
            busy_threshold: DEFAULT_BUSY_THRESHOLD,
        }
    }
}

impl SysbottleConfig {
    /// Sets the CPU threshold.
    #[must_use]
    pub const fn with_cpu_threshold(mut self, percent: f64) -> Self {
        self.cpu_threshold = percent;
        self
    }

    /// Sets the iowait threshold.
    #[must_use]
    pub const fn with_iowait_threshold(mut self, percent: f64) -> Self {
        self.iowait_threshold = percent;
        self
    }

    /// Sets the queue depth threshold.
    #[must_use]
    pub const fn with_queue_threshold(mut self, depth: f64) -> Self {
        self.queue_threshold = depth;
        self
    }

    /// Sets the busy-time threshold.
    #[must_use]
    pub const fn with_busy_threshold(mut self, percent: f64) -> Self {
        self.busy_threshold = percent;
        self
    }

    /// Restricts the analysis to the given devices.
    #[must_use]
    pub fn with_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if `device` is part of the analysis.
    #[must_use]
    pub fn wants_device(&self, device: &str) -> bool {
        self.devices.is_empty() || self.devices.contains(device)
    }

    /// Validates thresholds and the device list.
    ///
    /// # Errors
    ///
    /// Returns an error for negative or non-finite thresholds, percentages
    /// above 100, or an empty device name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("cpu threshold", self.cpu_threshold),
            ("iowait threshold", self.iowait_threshold),
            ("queue threshold", self.queue_threshold),
            ("busy threshold", self.busy_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        for (name, value) in [
            ("cpu threshold", self.cpu_threshold),
            ("iowait threshold", self.iowait_threshold),
            ("busy threshold", self.busy_threshold),
        ] {
            if value > 100.0 {
                return Err(ConfigError::PercentOutOfRange { name, value });
            }
        }

        if self.devices.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::EmptyDeviceName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_match_documented_values() {
        let config = SysbottleConfig::default();
        assert_eq!(config.cpu_threshold, 50.0);
        assert_eq!(config.iowait_threshold, 5.0);
        assert_eq!(config.queue_threshold, 1.0);
        assert_eq!(config.busy_threshold, 5.0);
        assert!(config.devices.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = SysbottleConfig::default()
            .with_cpu_threshold(80.0)
            .with_iowait_threshold(10.0)
            .with_queue_threshold(2.5)
            .with_busy_threshold(20.0)
            .with_devices(["sda", "nvme0n1"]);

        assert_eq!(config.cpu_threshold, 80.0);
        assert_eq!(config.iowait_threshold, 10.0);
        assert_eq!(config.queue_threshold, 2.5);
        assert_eq!(config.busy_threshold, 20.0);
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn empty_allow_list_wants_everything() {
        let config = SysbottleConfig::default();
        assert!(config.wants_device("sda"));
        assert!(config.wants_device("dm-0"));
    }

    #[test]
    fn allow_list_filters_devices() {
        let config = SysbottleConfig::default().with_devices(["sda"]);
        assert!(config.wants_device("sda"));
        assert!(!config.wants_device("sdb"));
    }

    #[test_case(SysbottleConfig::default().with_cpu_threshold(-1.0) ; "negative cpu")]
    #[test_case(SysbottleConfig::default().with_queue_threshold(f64::NAN) ; "nan queue")]
    #[test_case(SysbottleConfig::default().with_iowait_threshold(f64::INFINITY) ; "infinite iowait")]
    fn rejects_invalid_thresholds(config: SysbottleConfig) {
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn rejects_percent_above_hundred() {
        let config = SysbottleConfig::default().with_busy_threshold(101.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::PercentOutOfRange {
                name: "busy threshold",
                value: 101.0,
            })
        );
    }

    #[test]
    fn queue_threshold_is_not_a_percentage() {
        let config = SysbottleConfig::default().with_queue_threshold(250.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_device_name() {
        let config = SysbottleConfig::default().with_devices(["sda", " "]);
        assert_eq!(config.validate(), Err(ConfigError::EmptyDeviceName));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = SysbottleConfig::default().with_devices(["sda"]);
        let json = serde_json::to_string(&config).unwrap();
        let back: SysbottleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
