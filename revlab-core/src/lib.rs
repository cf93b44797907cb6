//! RevLab Core: intraday reversal analysis for futures bar series.
//!
//! This crate contains:
//! - Domain types (bars, intervals, validated series)
//! - Data providers (Yahoo chart API, CSV import) and series loading
//! - Morning-range indicators
//! - Window filter, reversal detector and summarizer
//! - Run configuration and export formats

pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod export;
pub mod indicators;
pub mod pipeline;

pub use analysis::{AnalysisError, ReversalStats, TimeWindow, WindowedBar};
pub use config::{AnalysisConfig, ConfigError};
pub use data::{DataError, DataProvider, FetchRequest};
pub use domain::{Bar, Interval, Series};
pub use pipeline::{analyze, AnalysisParams, ReversalReport};

