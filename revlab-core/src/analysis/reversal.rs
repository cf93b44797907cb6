//! Reversal detector.
//!
//! A bar is a reversal when its return from the previous close is below the
//! threshold and the next bar closes strictly higher. Previous and next bars
//! are always taken from the full series, never from the windowed subset: a
//! 09:40 bar's predecessor is the 09:35 bar even though 09:35 is outside a
//! 09:40-09:50 window.

use super::window::WindowView;
use super::AnalysisError;
use crate::domain::Bar;
use crate::indicators::{Indicator, MorningRange, MorningRangeVolatility};
use chrono::NaiveTime;
use log::debug;
use serde::{Deserialize, Serialize};

/// Default return threshold, in percent.
pub const DEFAULT_THRESHOLD: f64 = -0.5;

/// Settings for the morning-range feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorningRangeConfig {
    /// Bars at or before this time of day feed the day's range.
    pub cutoff: NaiveTime,
    /// Trailing bars in the rolling standard deviation.
    pub std_window: usize,
}

impl Default for MorningRangeConfig {
    fn default() -> Self {
        Self {
            cutoff: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            std_window: 20,
        }
    }
}

/// A windowed bar annotated with the detector's derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedBar {
    /// Position of this bar in the full series.
    pub series_index: usize,
    #[serde(flatten)]
    pub bar: Bar,
    pub prev_close: Option<f64>,
    pub return_pct: Option<f64>,
    pub next_close: Option<f64>,
    pub next_return_pct: Option<f64>,
    pub reversal: bool,
    pub morning_range: Option<f64>,
    pub morning_range_std: Option<f64>,
}

/// Percentage change from `from` to `to`; `None` when `from` is zero or either side is not finite.
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 || !from.is_finite() || !to.is_finite() {
        return None;
    }
    Some((to - from) / from * 100.0)
}

#[derive(Debug, Clone)]
struct MorningFeatures {
    range: MorningRange,
    volatility: MorningRangeVolatility,
}

/// Flags reversals over a windowed view.
#[derive(Debug, Clone)]
pub struct ReversalDetector {
    threshold: f64,
    features: Option<MorningFeatures>,
}

impl ReversalDetector {
    /// Detector with a return threshold in percent (e.g. `-0.5`).
    pub fn new(threshold: f64) -> Result<Self, AnalysisError> {
        if !threshold.is_finite() {
            return Err(AnalysisError::InvalidParameter(format!(
                "threshold must be a finite percentage, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            features: None,
        })
    }

    /// Also attach the morning range and its rolling volatility to each bar.
    pub fn with_morning_range(mut self, config: MorningRangeConfig) -> Result<Self, AnalysisError> {
        if config.std_window < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "morning range std window must be >= 2, got {}",
                config.std_window
            )));
        }
        let range = MorningRange::new(config.cutoff);
        let volatility = MorningRangeVolatility::new(range.clone(), config.std_window);
        self.features = Some(MorningFeatures { range, volatility });
        Ok(self)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True iff `return_pct < threshold` and `next_close > close`.
    pub fn is_reversal(&self, return_pct: Option<f64>, close: f64, next_close: Option<f64>) -> bool {
        match (return_pct, next_close) {
            (Some(r), Some(next)) => r < self.threshold && next > close,
            _ => false,
        }
    }

    /// Annotate every bar of the view, in series order.
    pub fn annotate(&self, view: &WindowView<'_>) -> Vec<WindowedBar> {
        let series = view.series();

        // Features run on the full series so windowing cannot shorten their history.
        let features = self.features.as_ref().map(|f| {
            (
                f.range.compute(series.bars()),
                f.volatility.compute(series.bars()),
            )
        });

        let table: Vec<WindowedBar> = view
            .iter()
            .map(|(i, bar)| {
                let prev_close = series.prev_close(i);
                let next_close = series.next_close(i);
                let return_pct = prev_close.and_then(|p| pct_change(p, bar.close));
                let next_return_pct = next_close.and_then(|n| pct_change(bar.close, n));
                let reversal = self.is_reversal(return_pct, bar.close, next_close);

                let (morning_range, morning_range_std) = match &features {
                    Some((range, std)) => (defined(range[i]), defined(std[i])),
                    None => (None, None),
                };

                WindowedBar {
                    series_index: i,
                    bar: bar.clone(),
                    prev_close,
                    return_pct,
                    next_close,
                    next_return_pct,
                    reversal,
                    morning_range,
                    morning_range_std,
                }
            })
            .collect();

        debug!(
            "threshold {}%: {} of {} windowed bars flagged",
            self.threshold,
            table.iter().filter(|b| b.reversal).count(),
            table.len()
        );
        table
    }
}

impl Default for ReversalDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            features: None,
        }
    }
}

fn defined(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::window::{filter_window, TimeWindow};
    use crate::domain::{Interval, Series};
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// One day of 5-minute bars starting at `start`, one close per bar.
    fn day_series(start: NaiveTime, closes: &[f64]) -> Series {
        let date = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: date.and_time(start) + chrono::Duration::minutes(5 * i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 100,
            })
            .collect();
        Series::new("NQ=F", Interval::FiveMinutes, bars).unwrap()
    }

    fn annotate(series: &Series, detector: &ReversalDetector) -> Vec<WindowedBar> {
        let windowed = filter_window(series, TimeWindow::default()).unwrap();
        detector.annotate(windowed.view().unwrap())
    }

    #[test]
    fn pct_change_guards_zero_base() {
        assert_eq!(pct_change(0.0, 5.0), None);
        assert_eq!(pct_change(f64::NAN, 5.0), None);
        let r = pct_change(200.0, 199.0).unwrap();
        assert!((r - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_finite_threshold() {
        assert!(ReversalDetector::new(f64::NAN).is_err());
        assert!(ReversalDetector::new(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn rejects_degenerate_std_window() {
        let cfg = MorningRangeConfig {
            std_window: 1,
            ..MorningRangeConfig::default()
        };
        assert!(ReversalDetector::default().with_morning_range(cfg).is_err());
    }

    #[test]
    fn flags_drop_followed_by_uptick() {
        // 09:35, 09:40, 09:45 (-0.8%), 09:50 (up), 09:55
        let s = day_series(hm(9, 35), &[1000.0, 1000.0, 992.0, 995.0, 995.0]);
        let table = annotate(&s, &ReversalDetector::default());
        assert_eq!(table.len(), 3);

        let flagged: Vec<_> = table.iter().filter(|b| b.reversal).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].bar.time(), hm(9, 45));
        assert_eq!(flagged[0].prev_close, Some(1000.0));
        assert_eq!(flagged[0].next_close, Some(995.0));
        assert!((flagged[0].return_pct.unwrap() - (-0.8)).abs() < 1e-9);
    }

    #[test]
    fn drop_without_uptick_is_not_a_reversal() {
        let s = day_series(hm(9, 35), &[1000.0, 1000.0, 992.0, 992.0, 995.0]);
        let table = annotate(&s, &ReversalDetector::default());
        assert!(table.iter().all(|b| !b.reversal));
    }

    #[test]
    fn shallow_drop_is_not_a_reversal() {
        // -0.3% with default -0.5% threshold
        let s = day_series(hm(9, 35), &[1000.0, 1000.0, 997.0, 1005.0]);
        let table = annotate(&s, &ReversalDetector::default());
        assert!(table.iter().all(|b| !b.reversal));
    }

    #[test]
    fn predecessor_comes_from_full_series() {
        // The 09:40 bar drops 1% from the 09:35 bar, which is outside the window.
        let s = day_series(hm(9, 35), &[1000.0, 990.0, 995.0]);
        let table = annotate(&s, &ReversalDetector::default());
        assert_eq!(table[0].bar.time(), hm(9, 40));
        assert_eq!(table[0].prev_close, Some(1000.0));
        assert!(table[0].reversal);
    }

    #[test]
    fn successor_comes_from_full_series() {
        // The 09:50 bar drops; the uptick is at 09:55, outside the window.
        let s = day_series(hm(9, 40), &[1000.0, 1000.0, 990.0, 999.0]);
        let table = annotate(&s, &ReversalDetector::default());
        let last = table.last().unwrap();
        assert_eq!(last.bar.time(), hm(9, 50));
        assert_eq!(last.next_close, Some(999.0));
        assert!(last.reversal);
    }

    #[test]
    fn first_and_last_bars_of_series_have_undefined_neighbours() {
        // Series starts inside the window and ends inside it.
        let s = day_series(hm(9, 40), &[1000.0, 990.0, 980.0]);
        let table = annotate(&s, &ReversalDetector::default());
        assert_eq!(table[0].prev_close, None);
        assert_eq!(table[0].return_pct, None);
        assert!(!table[0].reversal);

        let last = table.last().unwrap();
        assert_eq!(last.next_close, None);
        assert_eq!(last.next_return_pct, None);
        assert!(!last.reversal);
    }

    #[test]
    fn morning_features_off_by_default() {
        let s = day_series(hm(9, 35), &[1000.0, 1000.0, 1000.0]);
        let table = annotate(&s, &ReversalDetector::default());
        assert!(table.iter().all(|b| b.morning_range.is_none() && b.morning_range_std.is_none()));
    }

    #[test]
    fn morning_features_sampled_from_full_series() {
        // 08:50, 08:55, 09:00 feed the range; 09:05.. do not.
        let closes: Vec<f64> = (0..14).map(|i| 1000.0 + i as f64).collect();
        let s = day_series(hm(8, 50), &closes);
        let cfg = MorningRangeConfig {
            cutoff: hm(9, 0),
            std_window: 3,
        };
        let detector = ReversalDetector::default().with_morning_range(cfg).unwrap();
        let table = annotate(&s, &detector);
        assert_eq!(table.len(), 3);
        for b in &table {
            // high(09:00) - low(08:50) = 1003 - 999
            assert_eq!(b.morning_range, Some(4.0));
            // Constant range over the trailing window gives zero dispersion
            assert_eq!(b.morning_range_std, Some(0.0));
        }
    }

    #[test]
    fn morning_features_indexed_by_series_position() {
        // Per day: 09:00 (feeds the range), then 09:40, 09:45, 09:50.
        // Morning ranges 2, 4, 8 on consecutive days.
        let first = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();
        let mut bars = Vec::new();
        for (day, range) in [2.0, 4.0, 8.0].into_iter().enumerate() {
            let date = first + chrono::Duration::days(day as i64);
            let slots = [
                (hm(9, 0), range / 2.0),
                (hm(9, 40), 0.5),
                (hm(9, 45), 0.5),
                (hm(9, 50), 0.5),
            ];
            for (t, half) in slots {
                bars.push(Bar {
                    timestamp: date.and_time(t),
                    open: 100.0,
                    high: 100.0 + half,
                    low: 100.0 - half,
                    close: 100.0,
                    volume: 1,
                });
            }
        }
        let s = Series::new("NQ=F", Interval::FiveMinutes, bars).unwrap();
        let cfg = MorningRangeConfig {
            cutoff: hm(9, 0),
            std_window: 3,
        };
        let detector = ReversalDetector::default().with_morning_range(cfg).unwrap();
        let table = annotate(&s, &detector);
        assert_eq!(table.len(), 9);

        // Day 0, 09:40 is series index 1: not enough history yet.
        assert_eq!(table[0].series_index, 1);
        assert_eq!(table[0].morning_range, Some(2.0));
        assert_eq!(table[0].morning_range_std, None);

        // Day 1, 09:40 is series index 5: trailing ranges [2, 4, 4].
        let b = &table[3];
        assert_eq!(b.series_index, 5);
        assert_eq!(b.morning_range, Some(4.0));
        let expected = (4.0_f64 / 3.0).sqrt();
        assert!((b.morning_range_std.unwrap() - expected).abs() < 1e-12);

        // Day 2, 09:40 is series index 9: trailing ranges [4, 8, 8].
        let b = &table[6];
        assert_eq!(b.series_index, 9);
        assert_eq!(b.morning_range, Some(8.0));
        let expected = (16.0_f64 / 3.0).sqrt();
        assert!((b.morning_range_std.unwrap() - expected).abs() < 1e-12);

        // Day 2, 09:50 is series index 11: trailing ranges all 8.
        assert_eq!(table[8].morning_range_std, Some(0.0));
    }
}
