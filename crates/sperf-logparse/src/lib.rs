//! # sperf-logparse
//!
//! Streaming log parsing shared by the sperf diagnostic reports.
//!
//! This crate provides:
//!
//! - [`LineParser`] — Per-format line parser with private multi-line state
//! - [`Correlator`] / [`read_log`] — Pull-based row correlation over a reader
//! - [`spawn_read_log`] — The same correlation as a producer task feeding a
//!   single-slot channel
//! - [`Fields`] — Generic field rows, with constant extras merged in
//!
//! ## Example
//!
//! ```rust
//! use std::io::Cursor;
//! use sperf_logparse::{parser_fn, read_log, Fields};
//!
//! // Each line starting with "begin" opens a new record.
//! let parser = parser_fn(|line: &str| {
//!     if line.starts_with("begin") {
//!         let mut fields = Fields::new();
//!         fields.insert("header".to_string(), line.into());
//!         Ok::<_, std::io::Error>(Some(fields))
//!     } else {
//!         Ok(None)
//!     }
//! });
//!
//! let mut extras = Fields::new();
//! extras.insert("node".to_string(), "10.0.0.1".into());
//!
//! let rows = read_log(Cursor::new("begin 1\nmore\nbegin 2\n"), parser, extras)
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0]["node"], "10.0.0.1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod correlator;
pub mod error;
pub mod traits;

pub use correlator::{read_log, spawn_read_log, Correlator, LogReceiver, ProcessedLine};
pub use error::{BoxedParseError, LogParseError, Result};
pub use traits::{parser_fn, Fields, FnParser, LineParser, Record};
