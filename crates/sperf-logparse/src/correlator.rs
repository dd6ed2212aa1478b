//! Row correlation over multi-line log formats.
//!
//! Several formats spread one logical record across many physical lines, so
//! a record is only known to be complete once the *next* record starts or the
//! stream ends. The [`Correlator`] holds the most recent record as pending and
//! releases it at that point:
//!
//! ```text
//!   NoPendingRow ──new fields──► PendingRow(a)
//!   PendingRow(a) ──new fields b──► emit a, PendingRow(b)
//!   PendingRow(a) ──end of stream──► emit a
//!   any ──error──► emit error, drop pending
//! ```
//!
//! [`read_log`] is the synchronous pull form. [`spawn_read_log`] runs the same
//! machine on a blocking task and hands rows over a single-slot channel.

use std::io::BufRead;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{LogParseError, Result};
use crate::traits::{Fields, LineParser, Record};

/// One item of a correlated stream: a completed row or the terminal error.
pub type ProcessedLine<R> = Result<R>;

/// Pending-row state of the correlator.
#[derive(Debug)]
enum Pending<R> {
    NoPendingRow,
    PendingRow(R),
}

/// Where the correlator is within its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Reading,
    Draining,
    Done,
}

/// Drives a [`LineParser`] over a buffered reader, yielding rows in order.
///
/// The iterator is fused: once it yields an error or runs out of rows it
/// keeps returning `None`.
pub struct Correlator<B, P: LineParser> {
    reader: B,
    parser: P,
    extras: Fields,
    pending: Pending<P::Record>,
    stage: Stage,
    buf: String,
    line_number: usize,
}

/// Correlates rows from `reader` using `parser`, merging `extras` into each.
///
/// ```rust
/// use std::io::Cursor;
/// use sperf_logparse::{parser_fn, read_log, Fields};
///
/// let parser = parser_fn(|line: &str| {
///     let mut fields = Fields::new();
///     fields.insert("line".to_string(), line.into());
///     Ok::<_, std::io::Error>(Some(fields))
/// });
/// let rows: Vec<_> = read_log(Cursor::new("a\nb\n"), parser, Fields::new()).collect();
/// assert_eq!(rows.len(), 2);
/// ```
pub fn read_log<B, P>(reader: B, parser: P, extras: Fields) -> Correlator<B, P>
where
    B: BufRead,
    P: LineParser,
{
    Correlator {
        reader,
        parser,
        extras,
        pending: Pending::NoPendingRow,
        stage: Stage::Reading,
        buf: String::new(),
        line_number: 0,
    }
}

impl<B, P> Correlator<B, P>
where
    B: BufRead,
    P: LineParser,
{
    /// Returns the number of lines read so far.
    #[must_use]
    pub const fn lines_read(&self) -> usize {
        self.line_number
    }

    /// Makes `next` the pending row, returning the row it replaces.
    fn advance(&mut self, next: P::Record) -> Option<P::Record> {
        match std::mem::replace(&mut self.pending, Pending::PendingRow(next)) {
            Pending::NoPendingRow => None,
            Pending::PendingRow(mut row) => {
                row.merge_extras(&self.extras);
                Some(row)
            }
        }
    }

    fn fail(&mut self, err: LogParseError) -> Option<ProcessedLine<P::Record>> {
        self.pending = Pending::NoPendingRow;
        self.stage = Stage::Done;
        Some(Err(err))
    }

    fn drain(&mut self) -> Option<ProcessedLine<P::Record>> {
        self.stage = Stage::Done;
        match std::mem::replace(&mut self.pending, Pending::NoPendingRow) {
            Pending::NoPendingRow => None,
            Pending::PendingRow(mut row) => {
                row.merge_extras(&self.extras);
                trace!(line_number = self.line_number, "emitting final row");
                Some(Ok(row))
            }
        }
    }

    fn end_of_stream(&mut self) -> Option<ProcessedLine<P::Record>> {
        self.stage = Stage::Draining;
        match self.parser.finish() {
            Err(e) => self.fail(LogParseError::Finish {
                source: Box::new(e),
            }),
            Ok(Some(record)) => match self.advance(record) {
                Some(row) => Some(Ok(row)),
                None => self.drain(),
            },
            Ok(None) => self.drain(),
        }
    }
}

impl<B, P> Iterator for Correlator<B, P>
where
    B: BufRead,
    P: LineParser,
{
    type Item = ProcessedLine<P::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stage {
            Stage::Done => return None,
            Stage::Draining => return self.drain(),
            Stage::Reading => {}
        }

        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return self.end_of_stream(),
                Ok(_) => {}
                Err(e) => return self.fail(LogParseError::Io(e)),
            }
            self.line_number += 1;

            let line = self.buf.trim_end_matches(['\n', '\r']);
            match self.parser.parse_line(line) {
                Ok(None) => {}
                Ok(Some(record)) => {
                    if let Some(row) = self.advance(record) {
                        trace!(line_number = self.line_number, "emitting row");
                        return Some(Ok(row));
                    }
                }
                Err(e) => {
                    let err = LogParseError::Line {
                        line_number: self.line_number,
                        line: line.to_string(),
                        source: Box::new(e),
                    };
                    return self.fail(err);
                }
            }
        }
    }
}

impl<B, P> std::iter::FusedIterator for Correlator<B, P>
where
    B: BufRead,
    P: LineParser,
{
}

/// Receiving end of a correlation task started by [`spawn_read_log`].
pub struct LogReceiver<R> {
    rx: mpsc::Receiver<ProcessedLine<R>>,
    producer: Option<JoinHandle<()>>,
}

impl<R> LogReceiver<R> {
    /// Receives the next row, waiting for the producer if necessary.
    ///
    /// Returns `None` once the stream has ended. If the producer died
    /// without delivering its terminal item, a
    /// [`LogParseError::ProducerGone`] is returned instead of a silent end.
    pub async fn recv(&mut self) -> Option<ProcessedLine<R>> {
        if let Some(item) = self.rx.recv().await {
            return Some(item);
        }

        let producer = self.producer.take()?;
        match producer.await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "log producer task failed");
                Some(Err(LogParseError::ProducerGone(e.to_string())))
            }
        }
    }
}

/// Runs [`read_log`] on a blocking task, publishing rows one at a time.
///
/// Rows travel through a channel with a single slot, so the producer waits
/// for the consumer before it parses further ahead. Dropping the returned
/// [`LogReceiver`] stops the producer at its next send.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_read_log<B, P>(reader: B, parser: P, extras: Fields) -> LogReceiver<P::Record>
where
    B: BufRead + Send + 'static,
    P: LineParser + Send + 'static,
    P::Record: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let producer = tokio::task::spawn_blocking(move || {
        let mut rows = read_log(reader, parser, extras);
        let mut sent = 0usize;
        for item in rows.by_ref() {
            if tx.blocking_send(item).is_err() {
                debug!(sent, "row receiver dropped, stopping producer");
                return;
            }
            sent += 1;
        }
        debug!(sent, lines = rows.lines_read(), "log producer finished");
    });

    LogReceiver {
        rx,
        producer: Some(producer),
    }
}
