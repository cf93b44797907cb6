//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV import)
//! so the analysis can run against live downloads, saved files, or test doubles.

use crate::domain::Interval;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw intraday bar from a data provider (before validation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from provider for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("no data fetched for {symbol} ({start} to {end}, {interval}); check symbol and interval")]
    MissingData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    },
}

/// Parameters of a single fetch: one symbol, one date range, one interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    /// First calendar date requested (inclusive).
    pub start: NaiveDate,
    /// Last calendar date requested (inclusive).
    pub end: NaiveDate,
    pub interval: Interval,
}

impl FetchRequest {
    pub fn new(
        symbol: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Self, DataError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(DataError::InvalidRequest("symbol is empty".into()));
        }
        if start > end {
            return Err(DataError::InvalidRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self {
            symbol,
            start,
            end,
            interval,
        })
    }

    pub(crate) fn missing_data(&self) -> DataError {
        DataError::MissingData {
            symbol: self.symbol.clone(),
            start: self.start,
            end: self.end,
            interval: self.interval,
        }
    }
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
}

/// Trait for data providers (Yahoo Finance, CSV import, etc).
///
/// A fetch is one atomic request: it either returns every bar the source has
/// for the request or an error. Providers never retry.
pub trait DataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch intraday OHLCV bars for a symbol over a date range.
    ///
    /// An empty `bars` vector is a valid answer; the loader decides it is missing data.
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError>;
}
