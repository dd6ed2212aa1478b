//! Report rendering.
//!
//! [`render_text`] produces the human-readable report printed by
//! `sperf sysbottle`; [`render_json`] serialises the same [`Report`] for
//! tooling.

// Allow format string pushing for readability in formatter functions
#![allow(clippy::format_push_string)]

use chrono::NaiveDateTime;

use crate::analyzer::Report;
use crate::stats::{PercentileSummary, REPORTED_RANKS};

/// Title line of the text report.
pub const REPORT_TITLE: &str = "sysbottle";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COLUMN_GAP: usize = 2;

/// Renders the report as text.
#[must_use]
pub fn render_text(report: &Report) -> String {
    let mut output = String::new();
    output.push_str(REPORT_TITLE);
    output.push_str("\n\n");
    output.push_str(&format!("* total records: {}\n", report.total_records));
    if report.total_records == 0 {
        return output;
    }

    let mut sections = vec![format_summary(report), format_cpu_table(report)];
    if !report.devices.is_empty() {
        sections.push(format_device_table(report));
    }
    if !report.recommendations.is_empty() {
        sections.push(format_recommendations(&report.recommendations));
    }
    output.push_str(&sections.join("\n"));
    output
}

/// Renders the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

fn format_summary(report: &Report) -> String {
    let config = &report.config;
    let mut section = String::new();
    section.push_str(&format!(
        "* total bottleneck time: {:.2}% (cpu bound, io bound, or both)\n",
        report.bottleneck_percent
    ));
    section.push_str(&format!(
        "* cpu+system+nice+steal time > {:.2}%: {:.2}%\n",
        config.cpu_threshold, report.cpu_exceeded_percent
    ));
    section.push_str(&format!(
        "* iowait time > {:.2}%: {:.2}%\n",
        config.iowait_threshold, report.iowait_exceeded_percent
    ));
    section.push_str(&format!("* start {}\n", format_timestamp(report.start)));
    section.push_str(&format!("* end {}\n", format_timestamp(report.end)));
    section.push_str(&format!("* log time: {}s\n", report.log_time_seconds));
    section.push_str(&format!("* interval: {:.2}s\n", report.interval_seconds));
    for device in &report.devices {
        section.push_str(&format!(
            "* {} time at queue depth >= {:.2}: {:.2}%\n",
            device.name, config.queue_threshold, device.queue_exceeded_percent
        ));
    }
    let busy = if report.busy.is_empty() {
        "not busy".to_string()
    } else {
        report.busy.join(", ")
    };
    section.push_str(&format!("* busy: {busy}\n"));
    section
}

fn format_timestamp(timestamp: Option<NaiveDateTime>) -> String {
    timestamp.map_or_else(
        || "n/a".to_string(),
        |ts| ts.format(TIMESTAMP_FORMAT).to_string(),
    )
}

fn format_cpu_table(report: &Report) -> String {
    let mut rows = vec![header_row("resource")];
    if let Some(summary) = &report.cpu_percentiles {
        rows.push(summary_row("cpu", summary));
    }
    if let Some(summary) = &report.iowait_percentiles {
        rows.push(summary_row("iowait", summary));
    }
    format_table(&rows)
}

fn format_device_table(report: &Report) -> String {
    let mut rows = vec![header_row("device")];
    for device in &report.devices {
        let mut name_row = vec![device.name.clone()];
        name_row.resize(REPORTED_RANKS.len() + 1, String::new());
        rows.push(name_row);
        for (column, summary) in &device.percentiles {
            rows.push(summary_row(&format!("- {column}:"), summary));
        }
    }
    format_table(&rows)
}

fn format_recommendations(recommendations: &[String]) -> String {
    let mut section = String::new();
    section.push_str("recommendations\n");
    section.push_str("---------------\n");
    for recommendation in recommendations {
        section.push_str(recommendation);
        section.push('\n');
    }
    section
}

fn header_row(label: &str) -> Vec<String> {
    std::iter::once(label.to_string())
        .chain(REPORTED_RANKS.iter().map(|(name, _)| (*name).to_string()))
        .collect()
}

fn summary_row(label: &str, summary: &PercentileSummary) -> Vec<String> {
    std::iter::once(label.to_string())
        .chain(summary.values().iter().map(|v| format!("{v:.2}")))
        .collect()
}

/// Lays rows out in left-aligned columns, the first row being the header.
fn format_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                + COLUMN_GAP
        })
        .collect();

    let mut table = String::new();
    for (index, row) in rows.iter().enumerate() {
        table.push_str(&format_row(row, &widths));
        if index == 0 {
            let rule: Vec<String> = widths
                .iter()
                .map(|w| "-".repeat(w.saturating_sub(COLUMN_GAP)))
                .collect();
            table.push_str(&format_row(&rule, &widths));
        }
    }
    table
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str(&format!("{cell:<width$}"));
    }
    let mut line = line.trim_end().to_string();
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::BottleneckAnalyzer;
    use crate::config::SysbottleConfig;
    use crate::iostat::Measurement;
    use chrono::NaiveDate;

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, 15)
            .and_then(|d| d.and_hms_opt(15, 4, second))
            .unwrap()
    }

    fn sample(second: u32, user: f64, iowait: f64, queue: f64) -> Measurement {
        Measurement::new()
            .with_timestamp(at(second))
            .with_cpu("%user", user)
            .with_cpu("%system", 2.0)
            .with_cpu("%nice", 0.0)
            .with_cpu("%steal", 0.0)
            .with_cpu("%iowait", iowait)
            .with_device("sda", "aqu-sz", queue)
            .with_device("sda", "w_await", 1.5)
            .with_device("sda", "w/s", 30.0)
    }

    fn report() -> Report {
        let mut analyzer = BottleneckAnalyzer::new(SysbottleConfig::default());
        for m in [
            sample(0, 10.0, 1.0, 0.2),
            sample(5, 70.0, 9.0, 3.0),
            sample(10, 20.0, 2.0, 0.1),
            sample(15, 30.0, 1.0, 0.4),
        ] {
            analyzer.record(&m).unwrap();
        }
        analyzer.finish().unwrap()
    }

    #[test]
    fn empty_report_prints_only_count() {
        let report = BottleneckAnalyzer::new(SysbottleConfig::default())
            .finish()
            .unwrap();
        assert_eq!(render_text(&report), "sysbottle\n\n* total records: 0\n");
    }

    #[test]
    fn summary_lines() {
        let text = render_text(&report());

        assert!(text.starts_with("sysbottle\n\n* total records: 4\n"));
        assert!(text.contains("* total bottleneck time: 50.00% (cpu bound, io bound, or both)\n"));
        assert!(text.contains("* cpu+system+nice+steal time > 50.00%: 25.00%\n"));
        assert!(text.contains("* iowait time > 5.00%: 25.00%\n"));
        assert!(text.contains("* start 2021-01-15 15:04:00\n"));
        assert!(text.contains("* end 2021-01-15 15:04:15\n"));
        assert!(text.contains("* log time: 15s\n"));
        assert!(text.contains("* interval: 5.00s\n"));
        assert!(text.contains("* sda time at queue depth >= 1.00: 25.00%\n"));
        assert!(text.contains("* busy: cpu bound, io bound, sda busy\n"));
    }

    #[test]
    fn percentile_tables() {
        let text = render_text(&report());

        assert!(text.contains("resource  max    p99    p75    p50    p25    min\n"));
        assert!(text.contains("cpu       72.00  72.00  32.00  22.00  12.00  12.00\n"));
        assert!(text.contains("iowait    9.00   9.00   2.00   1.00   1.00   1.00\n"));
        assert!(text.contains("- aqu-sz:"));
        assert!(text.contains("- w_await:"));
        assert!(!text.contains("- w/s:"));
    }

    #[test]
    fn recommendations_close_the_report() {
        let text = render_text(&report());
        assert!(text.ends_with(
            "recommendations\n---------------\n\
             * decrease activity on sda\n\
             * tune for less CPU usage\n\
             * tune for less IO\n"
        ));
    }

    #[test]
    fn missing_timestamps_render_as_na() {
        let mut analyzer = BottleneckAnalyzer::new(SysbottleConfig::default());
        let m = Measurement::new()
            .with_cpu("%user", 1.0)
            .with_cpu("%system", 1.0)
            .with_cpu("%nice", 0.0)
            .with_cpu("%steal", 0.0)
            .with_cpu("%iowait", 0.0);
        analyzer.record(&m).unwrap();
        let text = render_text(&analyzer.finish().unwrap());

        assert!(text.contains("* start n/a\n"));
        assert!(text.contains("* end n/a\n"));
        assert!(text.contains("* busy: not busy\n"));
    }

    #[test]
    fn recommendations_section_is_omitted_when_empty() {
        let mut analyzer = BottleneckAnalyzer::new(SysbottleConfig::default());
        analyzer.record(&sample(0, 10.0, 1.0, 0.2)).unwrap();
        let report = analyzer.finish().unwrap();
        let text = render_text(&report);

        assert!(report.recommendations.is_empty());
        assert!(!text.contains("recommendations"));
        assert!(!text.contains("---------------"));
        assert!(!text.ends_with("\n\n"));
        assert!(text.lines().last().unwrap().starts_with("- w_await:"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render_text(&report()), render_text(&report()));
    }

    #[test]
    fn json_carries_report_fields() {
        let json = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total_records"], 4);
        assert_eq!(value["devices"][0]["name"], "sda");
        assert_eq!(value["recommendations"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn table_columns_pad_to_widest_cell() {
        let rows = vec![
            vec!["a".to_string(), "bb".to_string()],
            vec!["ccc".to_string(), "d".to_string()],
        ];
        assert_eq!(format_table(&rows), "a    bb\n---  --\nccc  d\n");
    }
}
