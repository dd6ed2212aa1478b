//! Sysbottle command implementation.
//!
//! Analyzes an iostat capture and prints the bottleneck report.

use std::io::Write;
use std::path::Path;

use sperf_sysbottle::{analyze_file, SysbottleConfig};
use tracing::debug;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Sysbottle command executor.
pub struct SysbottleCommand {
    config: SysbottleConfig,
}

impl SysbottleCommand {
    /// Create a new sysbottle command.
    #[must_use]
    pub const fn new(config: SysbottleConfig) -> Self {
        Self { config }
    }

    /// Execute the sysbottle command against `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` is not a regular file, the analysis fails,
    /// or the report cannot be written. Nothing is written on failure.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        file: &Path,
    ) -> Result<(), CliError> {
        if file.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "{} is a directory, expected an iostat capture",
                file.display()
            )));
        }

        debug!(file = %file.display(), config = ?self.config, "running sysbottle");
        let report = analyze_file(file, self.config.clone()).await?;
        format.write(writer, &report)
    }
}
