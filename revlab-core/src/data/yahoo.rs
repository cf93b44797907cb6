//! Yahoo Finance data provider.
//!
//! Fetches intraday OHLCV bars from Yahoo's v8 chart API in a single request.
//! Timestamps arrive as UTC epoch seconds and are converted to the exchange's
//! local wall-clock time so that time-of-day windows line up with the session.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV import path is the fallback when Yahoo is unavailable.

use super::provider::{DataError, DataProvider, DataSource, FetchRequest, FetchResult, RawBar};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use log::{debug, info};
use serde::Deserialize;
use std::time::Duration as StdDuration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    exchange_timezone_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Provider pointed at an alternative chart endpoint (mirrors, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build the chart API URL for a request.
    ///
    /// The UTC range is widened by a day on each side; bars are trimmed back to
    /// the requested local dates after time zone conversion.
    fn chart_url(&self, request: &FetchRequest) -> String {
        let start_ts = utc_midnight(request.start - Duration::days(1));
        let end_ts = utc_midnight(request.end + Duration::days(2));
        format!(
            "{}/{}?period1={start_ts}&period2={end_ts}&interval={}&includePrePost=false",
            self.base_url.trim_end_matches('/'),
            request.symbol,
            request.interval,
        )
    }

    /// Parse the chart API response body into RawBars for the requested dates.
    fn parse_response(request: &FetchRequest, body: &str) -> Result<Vec<RawBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!(
                "failed to parse response for {}: {e}",
                request.symbol
            ))
        })?;

        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: request.symbol.clone(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A range with no trading has no timestamp array at all.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let tz: Option<Tz> = data
            .meta
            .exchange_timezone_name
            .as_deref()
            .and_then(|name| name.parse().ok());
        let gmtoffset = data.meta.gmtoffset;

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = to_exchange_local(ts, tz, gmtoffset).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
            })?;

            let date = timestamp.date();
            if date < request.start || date > request.end {
                continue;
            }

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Skip placeholder rows where every price is None
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            bars.push(RawBar {
                timestamp,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }

        Ok(bars)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        let url = self.chart_url(request);
        debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: request.symbol.clone(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                symbol: request.symbol.clone(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let bars = Self::parse_response(request, &body)?;
        info!(
            "fetched {} bars for {} ({} to {}, {})",
            bars.len(),
            request.symbol,
            request.start,
            request.end,
            request.interval
        );

        Ok(FetchResult {
            symbol: request.symbol.clone(),
            bars,
            source: DataSource::YahooFinance,
        })
    }
}

fn utc_midnight(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::default()).and_utc().timestamp()
}

/// Convert epoch seconds to exchange-local wall-clock time.
///
/// Uses the IANA zone when Yahoo names one (DST-correct across the range),
/// otherwise the fixed `gmtoffset` reported for the instrument.
fn to_exchange_local(ts: i64, tz: Option<Tz>, gmtoffset: i64) -> Option<NaiveDateTime> {
    let utc = DateTime::from_timestamp(ts, 0)?;
    match tz {
        Some(tz) => Some(utc.with_timezone(&tz).naive_local()),
        None => Some(utc.naive_utc() + Duration::seconds(gmtoffset)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use chrono::NaiveTime;

    fn request() -> FetchRequest {
        FetchRequest::new(
            "NQ=F",
            NaiveDate::from_ymd_opt(2024, 12, 16).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 16).unwrap(),
            Interval::FiveMinutes,
        )
        .unwrap()
    }

    // 2024-12-16 14:40:00 UTC = 09:40 America/New_York (EST)
    const TS_0940: i64 = 1_734_360_000;

    fn body(tz: &str, timestamps: &[i64], closes: &[Option<f64>]) -> String {
        let n = timestamps.len();
        let opens: Vec<Option<f64>> = closes.to_vec();
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "exchangeTimezoneName": tz, "gmtoffset": -18000 },
                    "timestamp": timestamps,
                    "indicators": { "quote": [{
                        "open": opens,
                        "high": closes,
                        "low": closes,
                        "close": closes,
                        "volume": vec![Some(10u64); n],
                    }]}
                }],
                "error": null
            }
        })
        .to_string()
    }

    #[test]
    fn converts_to_exchange_local_time() {
        let json = body("America/New_York", &[TS_0940, TS_0940 + 300], &[Some(1.0), Some(2.0)]);
        let bars = YahooProvider::parse_response(&request(), &json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp.time(), NaiveTime::from_hms_opt(9, 40, 0).unwrap());
        assert_eq!(bars[1].timestamp.time(), NaiveTime::from_hms_opt(9, 45, 0).unwrap());
        assert_eq!(bars[1].close, 2.0);
    }

    #[test]
    fn falls_back_to_gmtoffset_for_unknown_zone() {
        let json = body("Not/AZone", &[TS_0940], &[Some(1.0)]);
        let bars = YahooProvider::parse_response(&request(), &json).unwrap();
        assert_eq!(bars[0].timestamp.time(), NaiveTime::from_hms_opt(9, 40, 0).unwrap());
    }

    #[test]
    fn skips_all_null_rows_and_out_of_range_dates() {
        let next_day = TS_0940 + 86_400;
        let json = body(
            "America/New_York",
            &[TS_0940, TS_0940 + 300, next_day],
            &[Some(1.0), None, Some(3.0)],
        );
        let bars = YahooProvider::parse_response(&request(), &json).unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn missing_timestamps_is_empty_not_error() {
        let json = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{"open":[],"high":[],"low":[],"close":[],"volume":[]}]}}],"error":null}"#;
        let bars = YahooProvider::parse_response(&request(), json).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = YahooProvider::parse_response(&request(), json).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn garbage_body_is_format_change() {
        let err = YahooProvider::parse_response(&request(), "<html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn url_carries_interval_and_widened_range() {
        let provider = YahooProvider::with_base_url("http://localhost/chart/").unwrap();
        let url = provider.chart_url(&request());
        assert!(url.starts_with("http://localhost/chart/NQ=F?"));
        assert!(url.contains("interval=5m"));
        // 2024-12-15 00:00 UTC
        assert!(url.contains("period1=1734220800"));
        // 2024-12-18 00:00 UTC
        assert!(url.contains("period2=1734480000"));
    }
}
