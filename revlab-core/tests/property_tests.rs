//! Property tests for analysis invariants.
//!
//! Uses proptest to verify:
//! 1. Point windows: start = end = T selects exactly the bars stamped T
//! 2. Predicate soundness: a flagged bar satisfies both reversal conditions
//! 3. Percentage bounds: always in [0, 100], zero iff nothing was flagged
//! 4. N/A average time iff zero reversals
//! 5. Idempotence of the pipeline

use chrono::{Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;
use revlab_core::analysis::{filter_window, TimeWindow, Windowed, NOT_AVAILABLE};
use revlab_core::domain::{Bar, Interval, Series};
use revlab_core::pipeline::{analyze, AnalysisParams};

const BARS_PER_DAY: usize = 19; // 09:00 ..= 10:30 every 5 minutes

fn session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn build_series(closes: &[f64]) -> Series {
    let first = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let day = (i / BARS_PER_DAY) as i64;
            let slot = (i % BARS_PER_DAY) as i64;
            Bar {
                timestamp: (first + Duration::days(day)).and_time(session_open())
                    + Duration::minutes(5 * slot),
                open: close,
                high: close + 0.25,
                low: close - 0.25,
                close,
                volume: 1,
            }
        })
        .collect();
    Series::new("NQ=F", Interval::FiveMinutes, bars).unwrap()
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// One to three sessions of closes around 100, rounded to the tick.
fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    (1..=3usize).prop_flat_map(|days| {
        prop::collection::vec(
            (98.0..102.0_f64).prop_map(|p| (p * 4.0).round() / 4.0),
            days * BARS_PER_DAY,
        )
    })
}

fn arb_threshold() -> impl Strategy<Value = f64> {
    (-2.0..0.0_f64).prop_map(|t| (t * 100.0).round() / 100.0)
}

/// Minutes after 09:00, on or off the 5-minute grid.
fn arb_clock() -> impl Strategy<Value = NaiveTime> {
    (0..=100i64).prop_map(|m| session_open() + Duration::minutes(m))
}

fn arb_window() -> impl Strategy<Value = TimeWindow> {
    (arb_clock(), arb_clock()).prop_map(|(a, b)| {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        TimeWindow::new(start, end).unwrap()
    })
}

// ── 1. Point windows ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn point_window_selects_only_exact_time(closes in arb_closes(), t in arb_clock()) {
        let series = build_series(&closes);
        let window = TimeWindow::new(t, t).unwrap();
        let expected = series.bars().iter().filter(|b| b.time() == t).count();

        match filter_window(&series, window).unwrap() {
            Windowed::Bars(view) => {
                prop_assert_eq!(view.len(), expected);
                for (_, bar) in view.iter() {
                    prop_assert_eq!(bar.time(), t);
                }
            }
            Windowed::Empty { .. } => prop_assert_eq!(expected, 0),
        }
    }
}

// ── 2. Predicate soundness ───────────────────────────────────────────

proptest! {
    #[test]
    fn flagged_bars_satisfy_both_conditions(
        closes in arb_closes(),
        threshold in arb_threshold(),
        window in arb_window(),
    ) {
        let series = build_series(&closes);
        let params = AnalysisParams { window, threshold, morning_range: None };
        let report = analyze(&series, &params).unwrap();

        for row in report.table.iter().filter(|r| r.reversal) {
            let ret = row.return_pct.unwrap();
            let next = row.next_close.unwrap();
            prop_assert!(ret < threshold);
            prop_assert!(next > row.bar.close);
            // neighbours come from the full series
            prop_assert_eq!(Some(next), series.next_close(row.series_index));
            prop_assert_eq!(row.prev_close, series.prev_close(row.series_index));
        }
    }
}

// ── 3 & 4. Summary bounds ────────────────────────────────────────────

proptest! {
    #[test]
    fn percentage_bounded_and_time_na_iff_no_reversals(
        closes in arb_closes(),
        threshold in arb_threshold(),
        window in arb_window(),
    ) {
        let series = build_series(&closes);
        let params = AnalysisParams { window, threshold, morning_range: None };
        let stats = analyze(&series, &params).unwrap().stats;

        prop_assert!((0.0..=100.0).contains(&stats.reversal_percentage));
        if stats.window_bars == 0 {
            prop_assert_eq!(stats.reversal_percentage, 0.0);
        }
        prop_assert_eq!(stats.reversal_percentage == 0.0, stats.total_reversals == 0);

        let display = stats.average_reversal_time_display();
        if stats.total_reversals == 0 {
            prop_assert_eq!(display, NOT_AVAILABLE);
        } else {
            prop_assert!(NaiveTime::parse_from_str(&display, "%H:%M:%S").is_ok());
            let t = stats.average_reversal_time.unwrap();
            prop_assert!(window.contains(t));
        }
    }
}

// ── 5. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn pipeline_is_idempotent(closes in arb_closes(), threshold in arb_threshold()) {
        let series = build_series(&closes);
        let params = AnalysisParams { threshold, ..AnalysisParams::default() };
        let first = analyze(&series, &params).unwrap();
        let second = analyze(&series, &params).unwrap();
        prop_assert_eq!(first.stats, second.stats);
        prop_assert_eq!(first.table, second.table);
    }
}
