//! CSV import provider.
//!
//! Reads bars saved as `timestamp,open,high,low,close[,volume]`, with
//! exchange-local timestamps formatted `YYYY-MM-DD HH:MM:SS` (a `T`
//! separator is accepted too). Used for offline runs and test fixtures.

use super::provider::{DataError, DataProvider, DataSource, FetchRequest, FetchResult, RawBar};
use chrono::NaiveDateTime;
use log::info;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<u64>,
}

/// Provider backed by a CSV file on disk.
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        let file = std::fs::File::open(&self.path)?;
        let bars: Vec<RawBar> = read_bars(file)?
            .into_iter()
            .filter(|b| {
                let d = b.timestamp.date();
                d >= request.start && d <= request.end
            })
            .collect();

        info!(
            "read {} bars for {} from {}",
            bars.len(),
            request.symbol,
            self.path.display()
        );

        Ok(FetchResult {
            symbol: request.symbol.clone(),
            bars,
            source: DataSource::CsvImport,
        })
    }
}

/// Parse every row of a bar CSV.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<RawBar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| {
            DataError::ValidationError(format!(
                "row {}: unparseable timestamp '{}'",
                row + 1,
                record.timestamp
            ))
        })?;
        bars.push(RawBar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume.unwrap_or(0),
        });
    }
    Ok(bars)
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
