//! CLI error types.

use std::fmt;

use sperf_sysbottle::SysbottleError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid argument.
    InvalidArgument(String),
    /// IO error.
    Io(std::io::Error),
    /// The analysis failed.
    Sysbottle(SysbottleError),
    /// Output formatting error.
    Format(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Sysbottle(e) => write!(f, "{e}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Sysbottle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SysbottleError> for CliError {
    fn from(err: SysbottleError) -> Self {
        Self::Sysbottle(err)
    }
}
