//! Run configuration, loadable from TOML.
//!
//! ```toml
//! symbol = "NQ=F"
//! start_date = "2024-12-15"
//! end_date = "2024-12-29"
//! interval = "5m"
//! start_time = "09:40"
//! end_time = "09:50"
//! threshold = -0.5
//! extended = true
//! morning_cutoff = "09:00"
//! range_std_window = 20
//! ```
//!
//! Every key is optional. Missing dates resolve against the caller's "today".

use crate::analysis::{parse_clock, MorningRangeConfig, TimeWindow, DEFAULT_THRESHOLD};
use crate::data::FetchRequest;
use crate::domain::Interval;
use crate::pipeline::AnalysisParams;
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use thiserror::Error;

/// Default symbol: Nasdaq-100 E-mini front month.
pub const DEFAULT_SYMBOL: &str = "NQ=F";

/// Calendar days fetched when no start date is given.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Serializable configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub interval: Interval,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    /// Return threshold in percent.
    pub threshold: f64,
    /// Attach the morning-range feature and extended statistics.
    pub extended: bool,
    #[serde(with = "clock")]
    pub morning_cutoff: NaiveTime,
    pub range_std_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let window = TimeWindow::default();
        let morning = MorningRangeConfig::default();
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            start_date: None,
            end_date: None,
            interval: Interval::default(),
            start_time: window.start(),
            end_time: window.end(),
            threshold: DEFAULT_THRESHOLD,
            extended: false,
            morning_cutoff: morning.cutoff,
            range_std_window: morning.std_window,
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol is empty".into()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.range_std_window < 2 {
            return Err(ConfigError::Invalid(format!(
                "range_std_window must be >= 2, got {}",
                self.range_std_window
            )));
        }
        self.window()?;
        Ok(())
    }

    pub fn window(&self) -> Result<TimeWindow, ConfigError> {
        TimeWindow::new(self.start_time, self.end_time)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Analysis parameters for the pipeline.
    pub fn params(&self) -> Result<AnalysisParams, ConfigError> {
        Ok(AnalysisParams {
            window: self.window()?,
            threshold: self.threshold,
            morning_range: self.extended.then_some(MorningRangeConfig {
                cutoff: self.morning_cutoff,
                std_window: self.range_std_window,
            }),
        })
    }

    /// Fetch request, with missing dates resolved against `today`.
    ///
    /// End defaults to `today`; start defaults to `DEFAULT_LOOKBACK_DAYS` before the end.
    pub fn fetch_request(&self, today: NaiveDate) -> Result<FetchRequest, ConfigError> {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or(end - Duration::days(DEFAULT_LOOKBACK_DAYS));
        FetchRequest::new(self.symbol.clone(), start, end, self.interval)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// `HH:MM` clock times in config files.
mod clock {
    use super::*;

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(d)?;
        parse_clock(&s).map_err(serde::de::Error::custom)
    }
}
