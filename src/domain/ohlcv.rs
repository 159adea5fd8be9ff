//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// typical_price * volume
    pub fn money_flow(&self) -> f64 {
        self.typical_price() * self.volume as f64
    }

    /// close * volume
    pub fn turnover(&self) -> f64 {
        self.close * self.volume as f64
    }

    /// All price fields finite and non-negative, volume non-negative.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
            && self.volume >= 0
    }
}
