//! Rolling volatility of the morning range.
//!
//! Trailing sample standard deviation (divide by N - 1) of the per-bar
//! morning-range series over the last `period` bars of the full series.
//! Lookback: period - 1 (first valid value at index period - 1).

use super::{Indicator, MorningRange};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct MorningRangeVolatility {
    range: MorningRange,
    period: usize,
    name: String,
}

impl MorningRangeVolatility {
    pub fn new(range: MorningRange, period: usize) -> Self {
        assert!(period >= 2, "sample stddev period must be >= 2");
        let name = format!("{}_std_{period}", range.name());
        Self {
            range,
            period,
            name,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for MorningRangeVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_sample_std(&self.range.compute(bars), self.period)
    }
}

/// Trailing sample standard deviation; NaN during warmup or when the window holds a NaN.
pub fn rolling_sample_std(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period < 2 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
        result[i] = (ss / (period - 1) as f64).sqrt();
    }

    result
}
