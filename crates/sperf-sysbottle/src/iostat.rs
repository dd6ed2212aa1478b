//! Parser for `iostat -x -c -d -t` captures.
//!
//! A capture repeats one block per sampling interval:
//!
//! ```text
//! 01/15/2021 03:04:05 PM
//! avg-cpu:  %user   %nice %system %iowait  %steal   %idle
//!            5.20    0.00    1.10    0.40    0.00   93.30
//!
//! Device            r/s     w/s   r_await   w_await  aqu-sz  %util
//! sda              0.50   12.00      0.80      2.10    0.03   1.20
//!
//! ```
//!
//! [`IoStatParser`] walks these lines with a three-state machine and returns
//! one [`Measurement`] each time a device section is closed by a blank line.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sperf_logparse::{Fields, LineParser, Record};
use tracing::debug;

use crate::error::IoStatError;

/// Timestamp formats tried in priority order: US 12-hour, day-first, month-first.
pub const DATE_FORMATS: [&str; 3] = [
    "%m/%d/%Y %I:%M:%S %p",
    "%d/%m/%y %H:%M:%S",
    "%m/%d/%y %H:%M:%S",
];

/// One sampling interval of an iostat capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// When the interval was sampled, if the capture carried a timestamp line.
    pub timestamp: Option<NaiveDateTime>,
    /// CPU values keyed by column name (`%user`, `%iowait`, ...).
    pub cpu: BTreeMap<String, f64>,
    /// Device values keyed by device name, then column name.
    pub devices: BTreeMap<String, BTreeMap<String, f64>>,
    /// Constant labels merged in by the correlator.
    pub labels: Fields,
}

impl Measurement {
    /// Creates an empty measurement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sample timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets one CPU column.
    #[must_use]
    pub fn with_cpu(mut self, column: impl Into<String>, value: f64) -> Self {
        self.cpu.insert(column.into(), value);
        self
    }

    /// Sets one device column.
    #[must_use]
    pub fn with_device(
        mut self,
        device: impl Into<String>,
        column: impl Into<String>,
        value: f64,
    ) -> Self {
        self.devices
            .entry(device.into())
            .or_default()
            .insert(column.into(), value);
        self
    }

    /// Returns a CPU column value.
    #[must_use]
    pub fn cpu_value(&self, column: &str) -> Option<f64> {
        self.cpu.get(column).copied()
    }
}

impl Record for Measurement {
    fn merge_extras(&mut self, extras: &Fields) {
        self.labels.merge_extras(extras);
    }
}

/// What the parser expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Scanning for a timestamp or a section header.
    #[default]
    Idle,
    /// A CPU header was seen; exactly one stat line follows.
    Cpu,
    /// A device header was seen; stat lines follow until a blank line.
    Device,
}

/// Line parser for iostat captures.
#[derive(Debug, Clone, Default)]
pub struct IoStatParser {
    state: ParserState,
    cpu_columns: Vec<String>,
    device_columns: Vec<String>,
    current: Measurement,
}

impl IoStatParser {
    /// Creates a parser in the idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ParserState {
        self.state
    }

    /// Returns the active CPU column names.
    #[must_use]
    pub fn cpu_columns(&self) -> &[String] {
        &self.cpu_columns
    }

    /// Returns the active device column names.
    #[must_use]
    pub fn device_columns(&self) -> &[String] {
        &self.device_columns
    }

    fn parse_idle(&mut self, line: &str) -> Result<(), IoStatError> {
        if line.starts_with("avg-cpu") {
            self.cpu_columns = header_columns(line);
            debug!(columns = ?self.cpu_columns, "cpu header");
            self.state = ParserState::Cpu;
        } else if line.starts_with("Device") {
            self.device_columns = header_columns(line);
            debug!(columns = ?self.device_columns, "device header");
            self.state = ParserState::Device;
        } else if line.starts_with(|c: char| c.is_ascii_digit()) {
            self.current.timestamp = Some(parse_timestamp(line)?);
        }
        Ok(())
    }

    fn parse_cpu(&mut self, line: &str) -> Result<(), IoStatError> {
        self.current.cpu = zip_columns("cpu", line, line.split_whitespace(), &self.cpu_columns)?;
        Ok(())
    }

    fn parse_device(&mut self, line: &str) -> Result<(), IoStatError> {
        let mut tokens = line.split_whitespace();
        let Some(device) = tokens.next() else {
            return Ok(());
        };
        let stats = zip_columns("device", line, tokens, &self.device_columns)?;
        self.current.devices.insert(device.to_string(), stats);
        Ok(())
    }
}

impl LineParser for IoStatParser {
    type Record = Measurement;
    type Error = IoStatError;

    fn parse_line(&mut self, line: &str) -> Result<Option<Measurement>, IoStatError> {
        let line = line.trim();
        match self.state {
            ParserState::Idle => {
                self.parse_idle(line)?;
                Ok(None)
            }
            ParserState::Cpu => {
                self.parse_cpu(line)?;
                self.state = ParserState::Idle;
                Ok(None)
            }
            ParserState::Device if line.is_empty() => {
                self.state = ParserState::Idle;
                Ok(Some(std::mem::take(&mut self.current)))
            }
            ParserState::Device => {
                self.parse_device(line)?;
                Ok(None)
            }
        }
    }

    /// Closes a device section that ran to the end of the capture.
    fn finish(&mut self) -> Result<Option<Measurement>, IoStatError> {
        if self.state == ParserState::Device {
            self.state = ParserState::Idle;
            return Ok(Some(std::mem::take(&mut self.current)));
        }
        Ok(None)
    }
}

/// Parses an iostat timestamp line, trying [`DATE_FORMATS`] in order.
///
/// # Errors
///
/// Returns [`IoStatError::UnknownDateFormat`] if no format matches.
pub fn parse_timestamp(line: &str) -> Result<NaiveDateTime, IoStatError> {
    let line = line.trim();
    for format in DATE_FORMATS {
        match NaiveDateTime::parse_from_str(line, format) {
            Ok(timestamp) => return Ok(timestamp),
            Err(e) => debug!(format, line, error = %e, "timestamp format did not match"),
        }
    }
    Err(IoStatError::UnknownDateFormat {
        line: line.to_string(),
        attempted: DATE_FORMATS.to_vec(),
    })
}

/// Parses one stat value, accepting a decimal comma.
///
/// # Errors
///
/// Returns [`IoStatError::InvalidNumber`] for anything but a finite number.
pub fn parse_number(line: &str, token: &str) -> Result<f64, IoStatError> {
    token
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IoStatError::InvalidNumber {
            line: line.to_string(),
            token: token.to_string(),
        })
}

fn header_columns(line: &str) -> Vec<String> {
    line.split_whitespace().skip(1).map(str::to_string).collect()
}

fn zip_columns<'a>(
    section: &'static str,
    line: &str,
    tokens: impl Iterator<Item = &'a str>,
    columns: &[String],
) -> Result<BTreeMap<String, f64>, IoStatError> {
    let values = tokens
        .map(|token| parse_number(line, token))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != columns.len() {
        return Err(IoStatError::ColumnCountMismatch {
            section,
            line: line.to_string(),
            expected: columns.len(),
            found: values.len(),
        });
    }
    Ok(columns.iter().cloned().zip(values).collect())
}
