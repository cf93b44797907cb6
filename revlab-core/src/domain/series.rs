//! Series: ordered bars for one instrument at one interval.

use super::{Bar, Interval};
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamps not strictly increasing at index {index}: {previous} then {current}")]
    NotIncreasing {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}

/// Immutable bar series.
///
/// Invariant: timestamps are strictly increasing. Derived values are never
/// written back; analysis stages read the bars and produce new tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NotIncreasing {
                    index: i + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            interval,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Close of the bar immediately before `index` in the full series.
    pub fn prev_close(&self, index: usize) -> Option<f64> {
        index.checked_sub(1).and_then(|i| self.bars.get(i)).map(|b| b.close)
    }

    /// Close of the bar immediately after `index` in the full series.
    pub fn next_close(&self, index: usize) -> Option<f64> {
        self.bars.get(index + 1).map(|b| b.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar_at(h: u32, m: u32, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 12, 16)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }

    #[test]
    fn accepts_increasing_timestamps() {
        let s = Series::new(
            "NQ=F",
            Interval::FiveMinutes,
            vec![bar_at(9, 40, 1.0), bar_at(9, 45, 2.0)],
        )
        .unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.prev_close(0), None);
        assert_eq!(s.prev_close(1), Some(1.0));
        assert_eq!(s.next_close(0), Some(2.0));
        assert_eq!(s.next_close(1), None);
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let err = Series::new(
            "NQ=F",
            Interval::FiveMinutes,
            vec![bar_at(9, 40, 1.0), bar_at(9, 40, 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::NotIncreasing { index: 1, .. }));
    }

    #[test]
    fn rejects_out_of_order() {
        let err = Series::new(
            "NQ=F",
            Interval::FiveMinutes,
            vec![bar_at(9, 45, 1.0), bar_at(9, 40, 2.0)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn empty_series_is_allowed() {
        let s = Series::new("NQ=F", Interval::FiveMinutes, vec![]).unwrap();
        assert!(s.is_empty());
    }
}
