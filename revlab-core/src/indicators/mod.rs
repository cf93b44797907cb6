//! Bar-series features.
//!
//! Indicators are pure functions: bar history in, numeric series out, one value
//! per bar with `f64::NAN` marking undefined values (warmup). They run on the
//! full series; the reversal detector samples them at windowed bars.

pub mod morning_range;
pub mod range_volatility;

pub use morning_range::MorningRange;
pub use range_volatility::{rolling_sample_std, MorningRangeVolatility};

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values should be `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "morning_range_0900").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic intraday bars for testing.
///
/// Each tuple is `(day_offset, time, high, low)`; days count from 2024-12-16.
/// Open and close sit at the midpoint.
#[cfg(test)]
pub fn make_intraday_bars(rows: &[(i64, chrono::NaiveTime, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();
    rows.iter()
        .map(|&(day, time, high, low)| {
            let mid = (high + low) / 2.0;
            Bar {
                timestamp: (base_date + chrono::Duration::days(day)).and_time(time),
                open: mid,
                high,
                low,
                close: mid,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
