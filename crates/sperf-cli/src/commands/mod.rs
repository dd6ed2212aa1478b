//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`sysbottle`] - CPU and disk bottleneck report for iostat captures

pub mod sysbottle;

pub use sysbottle::SysbottleCommand;
