use serde::{Deserialize, Serialize};

/// Milliseconds since Unix epoch.
pub type Timestamp = i64;

/// Horizontal chart position expressed in bars rather than pixels or time.
/// Fractional values address positions between two bars.
pub type LogicalIndex = f64;

pub const MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: Timestamp, // bucket start time
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Latest state of the most recent bar as seen by alert evaluation.
///
/// Only the range and the close matter for crossing decisions, so the open and
/// volume of a candle are dropped on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub time: Timestamp,
}

impl Bar {
    pub fn new(time: Timestamp, high: f64, low: f64, close: f64) -> Self {
        Self {
            high,
            low,
            close,
            time,
        }
    }

    /// Degenerate bar for single-value (line/area) series.
    pub fn from_value(time: Timestamp, value: f64) -> Self {
        Self {
            high: value,
            low: value,
            close: value,
            time,
        }
    }

    /// Inclusive range test against `[low, high]`.
    pub fn touches(&self, level: f64) -> bool {
        level >= self.low && level <= self.high
    }

    pub fn is_finite(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

impl From<&Candle> for Bar {
    fn from(c: &Candle) -> Self {
        Self {
            high: c.high,
            low: c.low,
            close: c.close,
            time: c.ts,
        }
    }
}

impl From<Candle> for Bar {
    fn from(c: Candle) -> Self {
        Bar::from(&c)
    }
}
