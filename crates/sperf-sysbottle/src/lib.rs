//! # sperf-sysbottle
//!
//! Bottleneck analysis of `iostat -x -c -d -t` captures.
//!
//! This crate provides:
//!
//! - [`IoStatParser`] — Line parser turning a capture into [`Measurement`]s
//! - [`BottleneckAnalyzer`] — Threshold counters, series and recommendations
//! - [`stats`] — Nearest-rank percentiles
//! - [`report`] — Text and JSON rendering of a [`Report`]
//! - [`analyze_file`] / [`analyze_reader`] — The whole pipeline
//!
//! ## Example
//!
//! ```rust
//! use std::io::Cursor;
//! use sperf_sysbottle::{analyze_reader_blocking, render_text, SysbottleConfig};
//!
//! let capture = "\
//! 01/15/2021 03:04:05 PM
//! avg-cpu:  %user   %nice %system %iowait  %steal   %idle
//!           75.00    0.00    5.00    0.40    0.00   19.60
//!
//! Device            r/s     w/s  aqu-sz  %util
//! sda              0.50   12.00    2.10   1.20
//!
//! ";
//!
//! let config = SysbottleConfig::default().with_devices(["sda"]);
//! let report = analyze_reader_blocking(Cursor::new(capture), config).unwrap();
//!
//! assert_eq!(report.total_records, 1);
//! assert!(render_text(&report).contains("* tune for less CPU usage"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod iostat;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use analyzer::{BottleneckAnalyzer, DeviceReport, Report, ReportAccumulator};
pub use config::SysbottleConfig;
pub use error::{AnalysisError, ConfigError, IoStatError, Result, SysbottleError};
pub use iostat::{parse_timestamp, IoStatParser, Measurement, ParserState};
pub use pipeline::{analyze_file, analyze_reader, analyze_reader_blocking};
pub use report::{render_json, render_text};
pub use stats::{percentile, PercentileSummary};
