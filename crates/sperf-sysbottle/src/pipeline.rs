//! End-to-end analysis of an iostat capture.
//!
//! Parsing runs as a producer task feeding the analyzer through a
//! single-slot channel. Any read or parse error aborts the run; no partial
//! report is ever returned.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sperf_logparse::{read_log, spawn_read_log, Fields};
use tracing::info;

use crate::analyzer::{BottleneckAnalyzer, Report};
use crate::config::SysbottleConfig;
use crate::error::{Result, SysbottleError};
use crate::iostat::IoStatParser;

/// Analyzes an iostat capture read from `reader`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the capture cannot be
/// read or parsed, or a required CPU column is missing.
pub async fn analyze_reader<B>(reader: B, config: SysbottleConfig) -> Result<Report>
where
    B: BufRead + Send + 'static,
{
    config.validate()?;
    info!(devices = ?config.devices, "starting sysbottle analysis");

    let mut rows = spawn_read_log(reader, IoStatParser::new(), Fields::new());
    let mut analyzer = BottleneckAnalyzer::new(config);
    while let Some(row) = rows.recv().await {
        analyzer.record(&row?)?;
    }

    finish(analyzer)
}

/// Synchronous variant of [`analyze_reader`] that pulls rows on the
/// calling thread.
///
/// # Errors
///
/// Same as [`analyze_reader`].
pub fn analyze_reader_blocking<B: BufRead>(reader: B, config: SysbottleConfig) -> Result<Report> {
    config.validate()?;
    info!(devices = ?config.devices, "starting sysbottle analysis");

    let mut analyzer = BottleneckAnalyzer::new(config);
    for row in read_log(reader, IoStatParser::new(), Fields::new()) {
        analyzer.record(&row?)?;
    }

    finish(analyzer)
}

/// Analyzes the iostat capture at `path`.
///
/// # Errors
///
/// Returns [`SysbottleError::Open`] if the file cannot be opened, otherwise
/// the same errors as [`analyze_reader`].
pub async fn analyze_file(path: impl AsRef<Path>, config: SysbottleConfig) -> Result<Report> {
    let path = path.as_ref();
    config.validate()?;
    let file = File::open(path).map_err(|source| SysbottleError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "opened iostat capture");
    analyze_reader(BufReader::new(file), config).await
}

fn finish(analyzer: BottleneckAnalyzer) -> Result<Report> {
    let report = analyzer.finish()?;
    info!(
        records = report.total_records,
        recommendations = report.recommendations.len(),
        "sysbottle analysis finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, IoStatError};
    use proptest::prelude::*;
    use std::io::{Cursor, Write};

    fn block(minute: u32, user: f64, queue: f64) -> String {
        format!(
            "01/15/2021 03:{minute:02}:00 PM\n\
             avg-cpu:  %user   %nice %system %iowait  %steal   %idle\n\
             {user:.2}    0.00    1.00    0.50    0.00   {idle:.2}\n\
             \n\
             Device            r/s     w/s   r_await   w_await  aqu-sz  %util\n\
             sda              0.50   12.00      0.80      2.10    {queue:.2}   1.20\n\
             sdb              0.00    1.50      0.00      4.00    0.00  10.00\n\
             \n",
            idle = 100.0 - user - 1.5,
        )
    }

    fn capture(blocks: usize) -> String {
        (0..blocks)
            .map(|i| block(i as u32, 10.0 + i as f64, 0.0))
            .collect()
    }

    #[tokio::test]
    async fn counts_every_block() {
        let report = analyze_reader(Cursor::new(capture(6)), SysbottleConfig::default())
            .await
            .unwrap();

        assert_eq!(report.total_records, 6);
        assert_eq!(report.log_time_seconds, 300);
        assert_eq!(report.devices.len(), 2);
    }

    #[tokio::test]
    async fn malformed_token_aborts_without_report() {
        let text = format!(
            "{}Device r/s\nsda 1.0\nsdb oops\n\n{}",
            capture(2),
            capture(2)
        );
        let err = analyze_reader(Cursor::new(text), SysbottleConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err.iostat_error(),
            Some(&IoStatError::InvalidNumber {
                line: "sdb oops".to_string(),
                token: "oops".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_reading() {
        let config = SysbottleConfig::default().with_cpu_threshold(-5.0);
        let err = analyze_reader(Cursor::new(capture(1)), config)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SysbottleError::Config(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = analyze_file(&path, SysbottleConfig::default())
            .await
            .unwrap_err();

        match err {
            SysbottleError::Open { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn analyzes_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(block(0, 70.0, 2.0).as_bytes()).unwrap();
        file.write_all(block(1, 10.0, 0.0).as_bytes()).unwrap();

        let report = analyze_file(file.path(), SysbottleConfig::default().with_devices(["sda"]))
            .await
            .unwrap();

        assert_eq!(report.total_records, 2);
        assert_eq!(report.cpu_exceeded, 1);
        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.devices[0].queue_exceeded, 1);
    }

    #[tokio::test]
    async fn async_and_blocking_agree() {
        let text = capture(4);
        let from_task = analyze_reader(Cursor::new(text.clone()), SysbottleConfig::default())
            .await
            .unwrap();
        let inline = analyze_reader_blocking(Cursor::new(text), SysbottleConfig::default()).unwrap();

        assert_eq!(from_task, inline);
    }

    #[test]
    fn capture_without_cpu_section_is_an_analysis_error() {
        let err = analyze_reader_blocking(
            Cursor::new("Device tps\nsda 1.0\n\n"),
            SysbottleConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, SysbottleError::Analysis(_)));
    }

    proptest! {
        #[test]
        fn report_is_deterministic(users in prop::collection::vec(0.0f64..90.0, 0..12)) {
            let text: String = users
                .iter()
                .enumerate()
                .map(|(i, user)| block(i as u32, *user, *user / 10.0))
                .collect();

            let first = analyze_reader_blocking(Cursor::new(text.clone()), SysbottleConfig::default()).unwrap();
            let second = analyze_reader_blocking(Cursor::new(text), SysbottleConfig::default()).unwrap();

            prop_assert_eq!(first.total_records, users.len());
            prop_assert_eq!(
                crate::report::render_text(&first),
                crate::report::render_text(&second)
            );
        }
    }
}
