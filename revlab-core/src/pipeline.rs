//! Single-pass analysis pipeline: window filter, reversal detector, summarizer.
//!
//! Each stage takes the previous stage's output as an argument; nothing is kept
//! between calls, so running the pipeline twice on the same series and params
//! gives the same report.

use crate::analysis::{
    filter_window, summarize, AnalysisError, MorningRangeConfig, ReversalDetector, ReversalStats,
    TimeWindow, WindowedBar, Windowed, DEFAULT_THRESHOLD,
};
use crate::domain::{Interval, Series};
use log::info;
use serde::Serialize;

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    pub window: TimeWindow,
    /// Return threshold in percent.
    pub threshold: f64,
    /// Enables the morning-range feature when set.
    pub morning_range: Option<MorningRangeConfig>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            window: TimeWindow::default(),
            threshold: DEFAULT_THRESHOLD,
            morning_range: None,
        }
    }
}

/// Terminal output of the pipeline: the annotated window table and its statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReversalReport {
    pub symbol: String,
    pub interval: Interval,
    pub window: TimeWindow,
    pub threshold: f64,
    pub table: Vec<WindowedBar>,
    pub stats: ReversalStats,
}

impl ReversalReport {
    /// True when no bar fell inside the window.
    pub fn is_empty_window(&self) -> bool {
        self.table.is_empty()
    }
}

/// Run the full analysis over `series`.
///
/// Fails with `MissingData` for an empty series. An empty window is not a
/// failure: the report has an empty table and zero-valued stats.
pub fn analyze(series: &Series, params: &AnalysisParams) -> Result<ReversalReport, AnalysisError> {
    let mut detector = ReversalDetector::new(params.threshold)?;
    if let Some(cfg) = params.morning_range {
        detector = detector.with_morning_range(cfg)?;
    }

    let windowed = filter_window(series, params.window)?;
    let (table, stats) = match &windowed {
        Windowed::Bars(view) => {
            let table = detector.annotate(view);
            let stats = summarize(&table);
            (table, stats)
        }
        Windowed::Empty { .. } => (Vec::new(), ReversalStats::empty()),
    };

    info!(
        "{} {} {}: {} reversals in {} windowed bars ({:.2}%)",
        series.symbol(),
        series.interval(),
        params.window,
        stats.total_reversals,
        stats.window_bars,
        stats.reversal_percentage
    );

    Ok(ReversalReport {
        symbol: series.symbol().to_string(),
        interval: series.interval(),
        window: params.window,
        threshold: params.threshold,
        table,
        stats,
    })
}
