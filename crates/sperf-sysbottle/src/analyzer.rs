//! Bottleneck aggregation over a sequence of measurements.
//!
//! The [`BottleneckAnalyzer`] folds every [`Measurement`] into a
//! [`ReportAccumulator`] and only produces a [`Report`] once the whole
//! capture has been consumed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::SysbottleConfig;
use crate::error::AnalysisError;
use crate::iostat::Measurement;
use crate::stats::PercentileSummary;

/// CPU columns summed into the CPU total.
pub const CPU_SUM_COLUMNS: [&str; 4] = ["%system", "%user", "%nice", "%steal"];
/// CPU column holding iowait.
pub const IOWAIT_COLUMN: &str = "%iowait";
/// Name of the summed CPU series.
pub const CPU_TOTAL_SERIES: &str = "total";
/// Recommendation added when the CPU total exceeds its threshold.
pub const CPU_RECOMMENDATION: &str = "* tune for less CPU usage";
/// Recommendation added when iowait exceeds its threshold.
pub const IO_RECOMMENDATION: &str = "* tune for less IO";

/// Recommendation added when a device queue reaches its threshold.
#[must_use]
pub fn device_recommendation(device: &str) -> String {
    format!("* decrease activity on {device}")
}

/// Returns true if a device column carries queue depth.
#[must_use]
pub fn is_queue_column(column: &str) -> bool {
    column.contains("qu")
}

/// Returns true if a device column belongs in the percentile table.
#[must_use]
pub fn is_reported_device_column(column: &str) -> bool {
    column.contains("qu") || column.contains("wait")
}

/// Running aggregates of an analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportAccumulator {
    /// Number of measurements seen.
    pub count: usize,
    /// Intervals with the CPU total above threshold.
    pub cpu_exceeded: usize,
    /// Intervals with iowait above threshold.
    pub iowait_exceeded: usize,
    /// Intervals per device with queue depth at or above threshold.
    pub queue_exceeded: BTreeMap<String, usize>,
    /// CPU series: the summed total plus every CPU column.
    pub cpu_series: BTreeMap<String, Vec<f64>>,
    /// Device series keyed by device, then column.
    pub device_series: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    /// Earliest timestamp seen.
    pub start: Option<NaiveDateTime>,
    /// Latest timestamp seen.
    pub end: Option<NaiveDateTime>,
    /// Deduplicated recommendations.
    pub recommendations: BTreeSet<String>,
}

impl ReportAccumulator {
    /// Returns `part` as a percentage of all measurements.
    #[must_use]
    pub fn percent_of_total(&self, part: usize) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        part as f64 / self.count as f64 * 100.0
    }

    /// Returns a CPU series by name.
    #[must_use]
    pub fn cpu_series(&self, name: &str) -> &[f64] {
        self.cpu_series.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Per-device section of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Device name.
    pub name: String,
    /// Intervals at or above the queue threshold.
    pub queue_exceeded: usize,
    /// Share of intervals at or above the queue threshold.
    pub queue_exceeded_percent: f64,
    /// Percentiles of queue and wait columns, keyed by column.
    pub percentiles: BTreeMap<String, PercentileSummary>,
}

/// The finished analysis of one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Thresholds the analysis ran with.
    pub config: SysbottleConfig,
    /// Number of measurements.
    pub total_records: usize,
    /// Intervals with the CPU total above threshold.
    pub cpu_exceeded: usize,
    /// Intervals with iowait above threshold.
    pub iowait_exceeded: usize,
    /// `(cpu_exceeded + iowait_exceeded) / total_records * 100`.
    pub bottleneck_percent: f64,
    /// Share of CPU-bound intervals.
    pub cpu_exceeded_percent: f64,
    /// Share of IO-bound intervals.
    pub iowait_exceeded_percent: f64,
    /// Earliest timestamp.
    pub start: Option<NaiveDateTime>,
    /// Latest timestamp.
    pub end: Option<NaiveDateTime>,
    /// Seconds between start and end.
    pub log_time_seconds: i64,
    /// Mean seconds between samples.
    pub interval_seconds: f64,
    /// Per-device results, ordered by device name.
    pub devices: Vec<DeviceReport>,
    /// Percentiles of the CPU total.
    pub cpu_percentiles: Option<PercentileSummary>,
    /// Percentiles of iowait.
    pub iowait_percentiles: Option<PercentileSummary>,
    /// Resources busy for at least the busy threshold; empty if none.
    pub busy: Vec<String>,
    /// Deduplicated recommendations in sorted order.
    pub recommendations: Vec<String>,
}

/// Aggregates measurements into a bottleneck [`Report`].
#[derive(Debug, Clone)]
pub struct BottleneckAnalyzer {
    config: SysbottleConfig,
    acc: ReportAccumulator,
}

impl BottleneckAnalyzer {
    /// Creates an analyzer with the given thresholds.
    #[must_use]
    pub fn new(config: SysbottleConfig) -> Self {
        Self {
            config,
            acc: ReportAccumulator::default(),
        }
    }

    /// Returns the analyzer's configuration.
    #[must_use]
    pub const fn config(&self) -> &SysbottleConfig {
        &self.config
    }

    /// Returns the aggregates collected so far.
    #[must_use]
    pub const fn accumulator(&self) -> &ReportAccumulator {
        &self.acc
    }

    /// Folds one measurement into the aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingCpuColumn`] if the measurement lacks a
    /// CPU column the analysis depends on. Nothing is recorded in that case.
    pub fn record(&mut self, measurement: &Measurement) -> Result<(), AnalysisError> {
        let mut cpu_parts = [0.0; CPU_SUM_COLUMNS.len()];
        for (part, column) in cpu_parts.iter_mut().zip(CPU_SUM_COLUMNS) {
            *part = required_cpu(measurement, column)?;
        }
        let iowait = required_cpu(measurement, IOWAIT_COLUMN)?;

        self.acc.count += 1;
        self.record_devices(measurement);
        self.record_cpu(measurement, cpu_parts.iter().sum(), iowait);
        self.record_window(measurement.timestamp);
        trace!(count = self.acc.count, "recorded measurement");
        Ok(())
    }

    fn record_devices(&mut self, measurement: &Measurement) {
        for (device, columns) in &measurement.devices {
            if !self.config.wants_device(device) {
                continue;
            }

            let series = self.acc.device_series.entry(device.clone()).or_default();
            let mut queue_busy = false;
            for (column, value) in columns {
                series.entry(column.clone()).or_default().push(*value);
                if is_queue_column(column) && value.trunc() >= self.config.queue_threshold {
                    queue_busy = true;
                }
            }

            let exceeded = self.acc.queue_exceeded.entry(device.clone()).or_default();
            if queue_busy {
                *exceeded += 1;
                if self.acc.recommendations.insert(device_recommendation(device)) {
                    debug!(device = %device, "device queue depth over threshold");
                }
            }
        }
    }

    /// The total is summed first and truncated once.
    fn record_cpu(&mut self, measurement: &Measurement, cpu_sum: f64, iowait: f64) {
        let total = cpu_sum.trunc();
        self.acc
            .cpu_series
            .entry(CPU_TOTAL_SERIES.to_string())
            .or_default()
            .push(total);
        if total > self.config.cpu_threshold {
            self.acc.cpu_exceeded += 1;
            self.acc.recommendations.insert(CPU_RECOMMENDATION.to_string());
        }

        for (column, value) in &measurement.cpu {
            self.acc
                .cpu_series
                .entry(column.clone())
                .or_default()
                .push(*value);
        }

        if iowait.trunc() > self.config.iowait_threshold {
            self.acc.iowait_exceeded += 1;
            self.acc.recommendations.insert(IO_RECOMMENDATION.to_string());
        }
    }

    fn record_window(&mut self, timestamp: Option<NaiveDateTime>) {
        let Some(ts) = timestamp else {
            return;
        };
        self.acc.start = Some(self.acc.start.map_or(ts, |start| start.min(ts)));
        self.acc.end = Some(self.acc.end.map_or(ts, |end| end.max(ts)));
    }

    /// Builds the final report.
    ///
    /// # Errors
    ///
    /// Propagates statistics errors; with at least one measurement every
    /// reported series is non-empty.
    pub fn finish(self) -> Result<Report, AnalysisError> {
        let acc = self.acc;
        let config = self.config;

        let log_time_seconds = match (acc.start, acc.end) {
            (Some(start), Some(end)) => (end - start).num_seconds(),
            _ => 0,
        };
        let interval_seconds = if acc.count > 1 {
            log_time_seconds as f64 / (acc.count - 1) as f64
        } else {
            0.0
        };

        let mut devices = Vec::with_capacity(acc.device_series.len());
        for (name, columns) in &acc.device_series {
            let queue_exceeded = acc.queue_exceeded.get(name).copied().unwrap_or(0);
            let mut percentiles = BTreeMap::new();
            for (column, samples) in columns {
                if is_reported_device_column(column) {
                    percentiles.insert(column.clone(), PercentileSummary::from_samples(samples)?);
                }
            }
            devices.push(DeviceReport {
                name: name.clone(),
                queue_exceeded,
                queue_exceeded_percent: acc.percent_of_total(queue_exceeded),
                percentiles,
            });
        }

        let summarize = |name: &str| -> Result<Option<PercentileSummary>, AnalysisError> {
            let samples = acc.cpu_series(name);
            if samples.is_empty() {
                return Ok(None);
            }
            PercentileSummary::from_samples(samples).map(Some)
        };
        let cpu_percentiles = summarize(CPU_TOTAL_SERIES)?;
        let iowait_percentiles = summarize(IOWAIT_COLUMN)?;

        let cpu_exceeded_percent = acc.percent_of_total(acc.cpu_exceeded);
        let iowait_exceeded_percent = acc.percent_of_total(acc.iowait_exceeded);

        // A resource is busy only if it exceeded at least once.
        let is_busy =
            |exceeded: usize, percent: f64| exceeded > 0 && percent >= config.busy_threshold;
        let mut busy = Vec::new();
        if is_busy(acc.cpu_exceeded, cpu_exceeded_percent) {
            busy.push("cpu bound".to_string());
        }
        if is_busy(acc.iowait_exceeded, iowait_exceeded_percent) {
            busy.push("io bound".to_string());
        }
        for device in &devices {
            if is_busy(device.queue_exceeded, device.queue_exceeded_percent) {
                busy.push(format!("{} busy", device.name));
            }
        }

        debug!(
            records = acc.count,
            cpu_exceeded = acc.cpu_exceeded,
            iowait_exceeded = acc.iowait_exceeded,
            devices = devices.len(),
            "analysis finished"
        );

        Ok(Report {
            total_records: acc.count,
            cpu_exceeded: acc.cpu_exceeded,
            iowait_exceeded: acc.iowait_exceeded,
            bottleneck_percent: acc.percent_of_total(acc.cpu_exceeded + acc.iowait_exceeded),
            cpu_exceeded_percent,
            iowait_exceeded_percent,
            start: acc.start,
            end: acc.end,
            log_time_seconds,
            interval_seconds,
            devices,
            cpu_percentiles,
            iowait_percentiles,
            busy,
            recommendations: acc.recommendations.iter().cloned().collect(),
            config,
        })
    }
}

fn required_cpu(measurement: &Measurement, column: &'static str) -> Result<f64, AnalysisError> {
    measurement
        .cpu_value(column)
        .ok_or(AnalysisError::MissingCpuColumn { column })
}
