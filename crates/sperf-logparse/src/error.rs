//! Error types for log correlation.

use thiserror::Error;

/// Boxed format-specific error carried inside [`LogParseError`].
pub type BoxedParseError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that terminate a correlated row stream.
#[derive(Debug, Error)]
pub enum LogParseError {
    /// Reading from the underlying stream failed.
    #[error("unable to read log stream: {0}")]
    Io(#[from] std::io::Error),

    /// The line parser rejected a line.
    #[error("unable to process line {line_number} '{line}': {source}")]
    Line {
        /// 1-based line number within the stream.
        line_number: usize,
        /// The offending line, without its line terminator.
        line: String,
        /// Format-specific cause.
        #[source]
        source: BoxedParseError,
    },

    /// The line parser rejected the end of the stream.
    #[error("unable to finish log stream: {source}")]
    Finish {
        /// Format-specific cause.
        #[source]
        source: BoxedParseError,
    },

    /// The producer task stopped without delivering a terminal item.
    #[error("log producer stopped unexpectedly: {0}")]
    ProducerGone(String),
}

impl LogParseError {
    /// Returns the format-specific cause, if this is a parser rejection.
    #[must_use]
    pub fn parse_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Line { source, .. } | Self::Finish { source } => Some(source.as_ref()),
            Self::Io(_) | Self::ProducerGone(_) => None,
        }
    }
}

/// Result type alias for correlation operations.
pub type Result<T> = std::result::Result<T, LogParseError>;
