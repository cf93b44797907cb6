//! Reversal statistics over an annotated window table.

use super::reversal::WindowedBar;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendering of an undefined average time.
pub const NOT_AVAILABLE: &str = "N/A";

/// Aggregate reversal statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalStats {
    /// Number of bars in the window table (the percentage denominator).
    pub window_bars: usize,
    pub total_reversals: usize,
    /// `total_reversals / window_bars * 100`, 0 for an empty window.
    pub reversal_percentage: f64,
    /// Mean time of day of flagged bars, truncated to whole seconds.
    pub average_reversal_time: Option<NaiveTime>,
    /// Mean `return_pct` of flagged bars.
    pub average_return: Option<f64>,
    /// Fraction of flagged bars whose next bar's return is positive.
    pub success_rate: Option<f64>,
}

impl ReversalStats {
    /// Zero-valued stats for a window with no bars.
    pub fn empty() -> Self {
        Self {
            window_bars: 0,
            total_reversals: 0,
            reversal_percentage: 0.0,
            average_reversal_time: None,
            average_return: None,
            success_rate: None,
        }
    }

    /// `HH:MM:SS`, or `N/A` when nothing was flagged.
    pub fn average_reversal_time_display(&self) -> String {
        match self.average_reversal_time {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Summarize an annotated window table.
pub fn summarize(table: &[WindowedBar]) -> ReversalStats {
    let window_bars = table.len();
    if window_bars == 0 {
        return ReversalStats::empty();
    }

    let flagged: Vec<&WindowedBar> = table.iter().filter(|b| b.reversal).collect();
    let total_reversals = flagged.len();
    let reversal_percentage = total_reversals as f64 / window_bars as f64 * 100.0;

    if flagged.is_empty() {
        return ReversalStats {
            window_bars,
            ..ReversalStats::empty()
        };
    }

    let mean_secs = flagged
        .iter()
        .map(|b| b.bar.time().num_seconds_from_midnight() as f64)
        .sum::<f64>()
        / total_reversals as f64;
    let average_reversal_time = NaiveTime::from_num_seconds_from_midnight_opt(mean_secs as u32, 0);

    let returns: Vec<f64> = flagged.iter().filter_map(|b| b.return_pct).collect();
    let average_return = mean(&returns);

    let successes = flagged
        .iter()
        .filter(|b| b.next_return_pct.is_some_and(|r| r > 0.0))
        .count();
    let success_rate = Some(successes as f64 / total_reversals as f64);

    ReversalStats {
        window_bars,
        total_reversals,
        reversal_percentage,
        average_reversal_time,
        average_return,
        success_rate,
    }
}

/// Count of flagged bars per time of day.
pub fn reversal_time_histogram(table: &[WindowedBar]) -> BTreeMap<NaiveTime, usize> {
    let mut hist = BTreeMap::new();
    for b in table.iter().filter(|b| b.reversal) {
        *hist.entry(b.bar.time()).or_insert(0) += 1;
    }
    hist
}

/// Success of flagged bars within one morning-range bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    pub lower: f64,
    pub upper: f64,
    pub reversals: usize,
    pub successes: usize,
    pub success_rate: Option<f64>,
}

/// Split flagged bars into `buckets` equal-width morning-range buckets.
///
/// Flagged bars without a morning range are ignored. Returns an empty list when
/// no flagged bar has a range or `buckets` is 0.
pub fn success_by_range_bucket(table: &[WindowedBar], buckets: usize) -> Vec<RangeBucket> {
    let ranged: Vec<(f64, bool)> = table
        .iter()
        .filter(|b| b.reversal)
        .filter_map(|b| {
            b.morning_range
                .map(|r| (r, b.next_return_pct.is_some_and(|n| n > 0.0)))
        })
        .collect();

    if ranged.is_empty() || buckets == 0 {
        return Vec::new();
    }

    let lo = ranged.iter().map(|(r, _)| *r).fold(f64::INFINITY, f64::min);
    let hi = ranged.iter().map(|(r, _)| *r).fold(f64::NEG_INFINITY, f64::max);
    let width = (hi - lo) / buckets as f64;

    let mut out: Vec<RangeBucket> = (0..buckets)
        .map(|k| RangeBucket {
            lower: lo + width * k as f64,
            upper: if k + 1 == buckets { hi } else { lo + width * (k + 1) as f64 },
            reversals: 0,
            successes: 0,
            success_rate: None,
        })
        .collect();

    for (range, success) in ranged {
        // All values collapse into the first bucket when every range is equal.
        let k = if width > 0.0 {
            (((range - lo) / width) as usize).min(buckets - 1)
        } else {
            0
        };
        out[k].reversals += 1;
        if success {
            out[k].successes += 1;
        }
    }

    for bucket in &mut out {
        if bucket.reversals > 0 {
            bucket.success_rate = Some(bucket.successes as f64 / bucket.reversals as f64);
        }
    }
    out
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
