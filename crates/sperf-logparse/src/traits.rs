//! The line parser capability shared by every log format.
//!
//! A [`LineParser`] sees one physical line at a time and keeps whatever
//! partial state it needs between calls. It only reports a record when that
//! record's fields are known; the [`Correlator`](crate::Correlator) decides
//! when a record is complete.

use std::collections::BTreeMap;

/// A generic field row, keyed by field name.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// A record produced by a [`LineParser`].
pub trait Record {
    /// Merges constant extra fields into this record.
    ///
    /// Extras win over fields of the same name.
    fn merge_extras(&mut self, extras: &Fields);
}

impl Record for Fields {
    fn merge_extras(&mut self, extras: &Fields) {
        for (key, value) in extras {
            self.insert(key.clone(), value.clone());
        }
    }
}

/// Parses the lines of one log format.
pub trait LineParser {
    /// The record type this parser produces.
    type Record: Record;

    /// The format-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Consumes the next line.
    ///
    /// Returns `Ok(None)` while a record is still being accumulated and
    /// `Ok(Some(record))` when a new record boundary has been reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is malformed. The stream is aborted.
    fn parse_line(&mut self, line: &str) -> Result<Option<Self::Record>, Self::Error>;

    /// Called once when the stream ends.
    ///
    /// Parsers that close records on a trailing delimiter can use this to
    /// hand back a record whose delimiter never arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if the partial state cannot form a record.
    fn finish(&mut self) -> Result<Option<Self::Record>, Self::Error> {
        Ok(None)
    }
}

/// A [`LineParser`] backed by a closure returning [`Fields`].
#[derive(Debug, Clone)]
pub struct FnParser<F> {
    read_line: F,
}

/// Wraps a closure as a [`LineParser`].
///
/// ```rust
/// use sperf_logparse::{parser_fn, Fields, LineParser};
///
/// let mut parser = parser_fn(|line: &str| {
///     let mut fields = Fields::new();
///     fields.insert("raw".to_string(), line.into());
///     Ok::<_, std::io::Error>(Some(fields))
/// });
/// assert!(parser.parse_line("hello").is_ok());
/// ```
pub const fn parser_fn<F, E>(read_line: F) -> FnParser<F>
where
    F: FnMut(&str) -> Result<Option<Fields>, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    FnParser { read_line }
}

impl<F, E> LineParser for FnParser<F>
where
    F: FnMut(&str) -> Result<Option<Fields>, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Record = Fields;
    type Error = E;

    fn parse_line(&mut self, line: &str) -> Result<Option<Fields>, E> {
        (self.read_line)(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extras_overwrite_fields() {
        let mut fields = Fields::new();
        fields.insert("node".to_string(), json!("a"));
        fields.insert("value".to_string(), json!(1));

        let mut extras = Fields::new();
        extras.insert("node".to_string(), json!("b"));
        extras.insert("file".to_string(), json!("iostat.txt"));

        fields.merge_extras(&extras);

        assert_eq!(fields.get("node"), Some(&json!("b")));
        assert_eq!(fields.get("value"), Some(&json!(1)));
        assert_eq!(fields.get("file"), Some(&json!("iostat.txt")));
    }

    #[test]
    fn closure_parser_forwards_lines() {
        let mut seen = Vec::new();
        let mut parser = parser_fn(|line: &str| {
            seen.push(line.to_string());
            Ok::<_, std::io::Error>(None)
        });

        assert!(matches!(parser.parse_line("a"), Ok(None)));
        assert!(matches!(parser.parse_line("b"), Ok(None)));
        assert!(matches!(parser.finish(), Ok(None)));
        drop(parser);
        assert_eq!(seen, vec!["a", "b"]);
    }
}
