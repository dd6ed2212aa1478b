//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sperf_sysbottle::config::{
    DEFAULT_BUSY_THRESHOLD, DEFAULT_CPU_THRESHOLD, DEFAULT_IOWAIT_THRESHOLD,
    DEFAULT_QUEUE_THRESHOLD,
};
use sperf_sysbottle::SysbottleConfig;

/// sperf - offline diagnostics for captured node telemetry.
#[derive(Parser, Debug, Clone)]
#[command(name = "sperf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr.
    #[arg(short = 'v', long = "debug", global = true)]
    pub debug: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable report.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Find CPU and disk bottlenecks in an iostat capture.
    ///
    /// The capture is the output of `iostat -x -c -d -t <interval>`.
    Sysbottle(SysbottleArgs),
}

/// Arguments for the sysbottle command.
#[derive(Args, Debug, Clone)]
pub struct SysbottleArgs {
    /// Percentage of cpu+system+nice+steal above which an interval is CPU bound.
    #[arg(short = 'c', long = "cpu", default_value_t = DEFAULT_CPU_THRESHOLD)]
    pub cpu_threshold: f64,

    /// Disk queue depth at or above which a device is busy for an interval.
    #[arg(short = 'q', long = "queue", default_value_t = DEFAULT_QUEUE_THRESHOLD)]
    pub queue_threshold: f64,

    /// Comma separated devices to analyze; all devices when omitted.
    #[arg(short = 'd', long = "devices", value_delimiter = ',')]
    pub devices: Vec<String>,

    /// Percentage of iowait above which an interval is IO bound.
    #[arg(short = 'i', long = "iowait", default_value_t = DEFAULT_IOWAIT_THRESHOLD)]
    pub iowait_threshold: f64,

    /// Percentage of busy intervals before a resource is reported as busy.
    #[arg(short = 't', long = "busy", default_value_t = DEFAULT_BUSY_THRESHOLD)]
    pub busy_threshold: f64,

    /// The iostat capture to analyze.
    #[arg(required = true)]
    pub file: PathBuf,
}

impl SysbottleArgs {
    /// Builds the analysis configuration from the flags.
    #[must_use]
    pub fn config(&self) -> SysbottleConfig {
        SysbottleConfig::default()
            .with_cpu_threshold(self.cpu_threshold)
            .with_queue_threshold(self.queue_threshold)
            .with_iowait_threshold(self.iowait_threshold)
            .with_busy_threshold(self.busy_threshold)
            .with_devices(self.devices.iter().cloned())
    }
}
