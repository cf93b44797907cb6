//! Bar canonicalization on a Polars frame.
//!
//! Raw provider bars are loaded into a `DataFrame`, void rows (any NaN price)
//! are filtered out, rows are stably sorted by timestamp and duplicate
//! timestamps collapse to their first occurrence. The result satisfies the
//! strictly-increasing invariant of `Series`.

use super::provider::{DataError, RawBar};
use crate::domain::Bar;
use chrono::DateTime;
use log::warn;
use polars::prelude::*;

/// Canonicalizer for provider bars.
pub struct Canonicalizer;

impl Canonicalizer {
    /// Drop rows with a NaN in any price column.
    pub fn drop_void(df: LazyFrame) -> LazyFrame {
        df.filter(
            col("open")
                .is_not_nan()
                .and(col("high").is_not_nan())
                .and(col("low").is_not_nan())
                .and(col("close").is_not_nan()),
        )
    }

    /// Stable sort by timestamp; the first of any duplicate timestamps wins.
    pub fn canonicalize(df: LazyFrame) -> LazyFrame {
        df.sort(
            ["timestamp"],
            SortMultipleOptions::default()
                .with_order_descending(false)
                .with_maintain_order(true),
        )
        .unique_stable(Some(vec!["timestamp".into()]), UniqueKeepStrategy::First)
    }
}

/// Sort, drop void bars, and dedupe timestamps (first occurrence wins).
pub fn canonicalize(raw: &[RawBar]) -> Result<Vec<Bar>, DataError> {
    let total = raw.len();
    let df = bars_to_dataframe(raw)?;

    let filled = Canonicalizer::drop_void(df.lazy())
        .collect()
        .map_err(|e| DataError::Frame(format!("void filter: {e}")))?;
    let void = total - filled.height();

    let unique = Canonicalizer::canonicalize(filled.lazy())
        .collect()
        .map_err(|e| DataError::Frame(format!("sort/dedupe: {e}")))?;
    let dupes = total - void - unique.height();

    if void > 0 {
        warn!("dropped {void} void bars (NaN prices)");
    }
    if dupes > 0 {
        warn!("dropped {dupes} bars with duplicate timestamps");
    }

    let bars = dataframe_to_bars(&unique)?;
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        warn!("{insane} bars fail OHLC sanity checks; kept as-is");
    }
    Ok(bars)
}

/// Raw bars as a frame; timestamps are stored as epoch microseconds of the
/// naive exchange-local time.
fn bars_to_dataframe(bars: &[RawBar]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_micros())
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Frame(format!("dataframe creation: {e}")))
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let map_err = |e: PolarsError| DataError::Frame(format!("column read: {e}"));

    let ts_ca = df.column("timestamp").map_err(map_err)?.i64().map_err(map_err)?;
    let price = |name: &str| -> Result<Float64Chunked, DataError> {
        Ok(df.column(name).map_err(map_err)?.f64().map_err(map_err)?.clone())
    };
    let open_ca = price("open")?;
    let high_ca = price("high")?;
    let low_ca = price("low")?;
    let close_ca = price("close")?;
    let vol_ca = df.column("volume").map_err(map_err)?.u64().map_err(map_err)?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let micros = ts_ca
            .get(i)
            .ok_or_else(|| DataError::Frame(format!("null timestamp at row {i}")))?;
        let timestamp = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| DataError::Frame(format!("timestamp out of range at row {i}")))?
            .naive_utc();

        bars.push(Bar {
            timestamp,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }
    Ok(bars)
}
