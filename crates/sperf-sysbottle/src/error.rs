//! Error types for iostat parsing and bottleneck analysis.

use std::path::PathBuf;

use sperf_logparse::LogParseError;
use thiserror::Error;

/// A structurally invalid line in an iostat capture.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IoStatError {
    /// A stat column held something other than a number.
    #[error("unable to parse line '{line}' for number '{token}'")]
    InvalidNumber {
        /// The offending line.
        line: String,
        /// The token that failed to parse.
        token: String,
    },

    /// A timestamp line matched none of the supported date formats.
    #[error("tried parsing in the following formats {attempted:?} but '{line}' does not match")]
    UnknownDateFormat {
        /// The offending line.
        line: String,
        /// Every format that was tried, in priority order.
        attempted: Vec<&'static str>,
    },

    /// A stat line did not have one value per header column.
    #[error("{section} line '{line}' has {found} values but the header has {expected} columns")]
    ColumnCountMismatch {
        /// Which block the line belongs to (`cpu` or `device`).
        section: &'static str,
        /// The offending line.
        line: String,
        /// Number of header columns.
        expected: usize,
        /// Number of values found.
        found: usize,
    },
}

/// Invalid analysis configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A threshold was negative, NaN or infinite.
    #[error("{name} must be a finite, non-negative number, got {value}")]
    InvalidThreshold {
        /// Threshold name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A percentage threshold exceeded 100.
    #[error("{name} is a percentage and must not exceed 100, got {value}")]
    PercentOutOfRange {
        /// Threshold name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// The device allow-list contained an empty name.
    #[error("device allow-list contains an empty device name")]
    EmptyDeviceName,
}

/// Measurements that cannot be aggregated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// A CPU column needed by the analysis is missing from the header.
    #[error("cpu header has no '{column}' column")]
    MissingCpuColumn {
        /// The missing column name.
        column: &'static str,
    },

    /// A statistic was requested over an empty series.
    #[error("cannot compute a percentile of an empty series")]
    EmptySeries,

    /// A requested rank was outside `[0, 1]`.
    #[error("percentile rank must be within [0, 1], got {0}")]
    InvalidRank(String),
}

/// Top-level error for a sysbottle run.
#[derive(Debug, Error)]
pub enum SysbottleError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The input file could not be opened.
    #[error("unable to open file {} with error {source}", .path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or parsing the capture failed.
    #[error("unable to analyze the file with error: {0}")]
    Parse(#[from] LogParseError),

    /// Aggregation failed.
    #[error("unable to generate analysis: {0}")]
    Analysis(#[from] AnalysisError),
}

impl SysbottleError {
    /// Returns the iostat line error behind this failure, if any.
    #[must_use]
    pub fn iostat_error(&self) -> Option<&IoStatError> {
        match self {
            Self::Parse(err) => err.parse_source()?.downcast_ref::<IoStatError>(),
            _ => None,
        }
    }
}

/// Result type alias for sysbottle operations.
pub type Result<T> = std::result::Result<T, SysbottleError>;
