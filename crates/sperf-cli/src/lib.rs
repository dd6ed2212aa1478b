//! # sperf-cli
//!
//! The `sperf` command-line interface.
//!
//! Provides commands for:
//! - `sysbottle`: CPU, iowait and disk queue bottlenecks from an iostat capture
//!
//! Reports go to stdout; logs and errors go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, SysbottleArgs};
pub use error::CliError;
pub use output::OutputFormat;
