//! Export formats: annotated window table and raw bars as CSV, full report as JSON.
//!
//! Bar CSV uses the same layout the CSV provider reads
//! (`timestamp,open,high,low,close,volume`), so a fetched series can be
//! saved once and re-analyzed offline.

use crate::analysis::WindowedBar;
use crate::domain::Series;
use crate::pipeline::ReversalReport;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

/// Export the annotated window table as CSV, one row per windowed bar.
///
/// Undefined values (no predecessor, no successor, feature off) are empty cells.
pub fn export_table_csv(table: &[WindowedBar]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "prev_close",
        "return_pct",
        "next_close",
        "next_return_pct",
        "reversal",
        "morning_range",
        "morning_range_std",
    ])?;

    for row in table {
        let b = &row.bar;
        wtr.write_record([
            b.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.6}", b.open),
            format!("{:.6}", b.high),
            format!("{:.6}", b.low),
            format!("{:.6}", b.close),
            b.volume.to_string(),
            opt(row.prev_close),
            opt(row.return_pct),
            opt(row.next_close),
            opt(row.next_return_pct),
            row.reversal.to_string(),
            opt(row.morning_range),
            opt(row.morning_range_std),
        ])?;
    }

    finish(wtr)
}

/// Export a series as bar CSV readable by the CSV provider.
pub fn export_bars_csv(series: &Series) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;
    for b in series.bars() {
        wtr.write_record([
            b.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Pretty-printed JSON of the whole report.
pub fn export_report_json(report: &ReversalReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
