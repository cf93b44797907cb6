//! Reversal analysis: window filter, reversal detector, summarizer.
//!
//! Every stage is a pure function of its inputs. The window filter keeps
//! back-references into the full series so the detector can read each bar's
//! true predecessor and successor, even when those fall outside the window.

pub mod reversal;
pub mod stats;
pub mod window;

pub use reversal::{pct_change, MorningRangeConfig, ReversalDetector, WindowedBar, DEFAULT_THRESHOLD};
pub use stats::{
    reversal_time_histogram, success_by_range_bucket, summarize, RangeBucket, ReversalStats,
    NOT_AVAILABLE,
};
pub use window::{filter_window, parse_clock, TimeWindow, WindowView, Windowed};

use thiserror::Error;

/// Errors from the analysis stages.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("no data for {symbol}: the series is empty, fetch data before running the analysis")]
    MissingData { symbol: String },

    #[error("invalid time window: {0}")]
    InvalidWindow(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
