//! Domain types for RevLab

pub mod bar;
pub mod interval;
pub mod series;

pub use bar::Bar;
pub use interval::{Interval, ParseIntervalError};
pub use series::{Series, SeriesError};
