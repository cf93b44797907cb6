//! Time-of-day window filter.
//!
//! A window is an inclusive `[start, end]` clock interval applied to every
//! calendar day of a series. Filtering never copies bars; it records the index
//! of each selected bar in the full series.

use super::AnalysisError;
use crate::domain::{Bar, Interval, Series};
use chrono::{NaiveDate, NaiveTime};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Parse a clock time written `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(s: &str) -> Result<NaiveTime, AnalysisError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| AnalysisError::InvalidWindow(format!("'{s}' is not a clock time (HH:MM)")))
}

/// Inclusive daily clock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AnalysisError> {
        if start > end {
            return Err(AnalysisError::InvalidWindow(format!(
                "start {} is after end {}",
                start.format("%H:%M:%S"),
                end.format("%H:%M:%S")
            )));
        }
        Ok(Self { start, end })
    }

    /// Window from `HH:MM` strings, e.g. `TimeWindow::parse("09:40", "09:50")`.
    pub fn parse(start: &str, end: &str) -> Result<Self, AnalysisError> {
        Self::new(parse_clock(start)?, parse_clock(end)?)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time <= self.end
    }

    /// True when bars of `interval` can land in the window on at most one
    /// clock time per day, or not at all (daily bars).
    pub fn narrower_than(&self, interval: Interval) -> bool {
        if !interval.is_intraday() {
            return true;
        }
        let span = (self.end - self.start).num_minutes();
        span < i64::from(interval.minutes())
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 40, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(9, 50, 0).unwrap_or_default(),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Bars of a series that fall inside a window, in series order.
#[derive(Debug, Clone)]
pub struct WindowView<'a> {
    series: &'a Series,
    window: TimeWindow,
    indices: Vec<usize>,
}

impl<'a> WindowView<'a> {
    /// The full, unfiltered series the view points into.
    pub fn series(&self) -> &'a Series {
        self.series
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Indices of selected bars in the full series (strictly increasing).
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected bars paired with their full-series index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Bar)> + '_ {
        let bars = self.series.bars();
        self.indices.iter().map(move |&i| (i, &bars[i]))
    }

    /// Selected indices grouped by calendar date.
    pub fn by_date(&self) -> BTreeMap<NaiveDate, Vec<usize>> {
        let mut groups: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (i, bar) in self.iter() {
            groups.entry(bar.date()).or_default().push(i);
        }
        groups
    }
}

/// Result of filtering: either some bars, or an explicit empty marker.
#[derive(Debug, Clone)]
pub enum Windowed<'a> {
    Bars(WindowView<'a>),
    /// No bar of any day fell inside the window.
    Empty { window: TimeWindow },
}

impl<'a> Windowed<'a> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Windowed::Empty { .. })
    }

    pub fn view(&self) -> Option<&WindowView<'a>> {
        match self {
            Windowed::Bars(view) => Some(view),
            Windowed::Empty { .. } => None,
        }
    }

    pub fn window(&self) -> TimeWindow {
        match self {
            Windowed::Bars(view) => view.window,
            Windowed::Empty { window } => *window,
        }
    }
}

/// Restrict `series` to bars whose time of day lies in `window`.
///
/// An empty series is `MissingData`. A series with no bars in the window is
/// not an error: it yields `Windowed::Empty`.
pub fn filter_window(series: &Series, window: TimeWindow) -> Result<Windowed<'_>, AnalysisError> {
    if series.is_empty() {
        return Err(AnalysisError::MissingData {
            symbol: series.symbol().to_string(),
        });
    }

    if window.narrower_than(series.interval()) {
        warn!(
            "window {window} is narrower than one {} bar; expect few or no matches",
            series.interval()
        );
    }

    let indices: Vec<usize> = series
        .bars()
        .iter()
        .enumerate()
        .filter(|(_, bar)| window.contains(bar.time()))
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        warn!(
            "no {} bars for {} fall inside {window}",
            series.interval(),
            series.symbol()
        );
        return Ok(Windowed::Empty { window });
    }

    debug!(
        "window {window}: {} of {} bars selected",
        indices.len(),
        series.len()
    );
    Ok(Windowed::Bars(WindowView {
        series,
        window,
        indices,
    }))
}
