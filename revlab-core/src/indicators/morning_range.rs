//! Morning range: early-session high/low spread per calendar date.
//!
//! For every bar, the value is max(high) - min(low) over all bars of the same
//! date whose time of day is <= the cutoff. Dates with no such bars get 0.
//!
//! The value for a date is the same on every bar of that date, including bars
//! before the cutoff: the feature describes the day, not the bar.

use super::Indicator;
use crate::domain::Bar;
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct MorningRange {
    cutoff: NaiveTime,
    name: String,
}

impl MorningRange {
    pub fn new(cutoff: NaiveTime) -> Self {
        Self {
            cutoff,
            name: format!("morning_range_{}", cutoff.format("%H%M")),
        }
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// Range per calendar date present in `bars`.
    pub fn per_date(&self, bars: &[Bar]) -> BTreeMap<NaiveDate, f64> {
        let mut extremes: BTreeMap<NaiveDate, Option<(f64, f64)>> = BTreeMap::new();
        for bar in bars {
            let entry = extremes.entry(bar.date()).or_insert(None);
            if bar.time() > self.cutoff {
                continue;
            }
            *entry = Some(match *entry {
                Some((hi, lo)) => (hi.max(bar.high), lo.min(bar.low)),
                None => (bar.high, bar.low),
            });
        }
        extremes
            .into_iter()
            .map(|(date, hl)| (date, hl.map_or(0.0, |(hi, lo)| hi - lo)))
            .collect()
    }
}

impl Default for MorningRange {
    fn default() -> Self {
        Self::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
    }
}

impl Indicator for MorningRange {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let by_date = self.per_date(bars);
        bars.iter()
            .map(|b| by_date.get(&b.date()).copied().unwrap_or(0.0))
            .collect()
    }
}
