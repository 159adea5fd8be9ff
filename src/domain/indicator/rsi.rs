//! RSI (Relative Strength Index), Wilder smoothing.
//!
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain is also 0 (a flat window),
//! where RSI is undefined and reads the neutral 50.
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

/// Reading for a window without any price change.
pub const FLAT_RSI: f64 = 50.0;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return IndicatorSeries::invalid(IndicatorType::Rsi(period), bars.iter().map(|b| b.date));
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        date: bars[0].date,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    });

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, window) in bars.windows(2).enumerate() {
        let change = window[1].close - window[0].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        let valid = if i + 1 < period {
            avg_gain += gain;
            avg_loss += loss;
            false
        } else if i + 1 == period {
            avg_gain = (avg_gain + gain) / period as f64;
            avg_loss = (avg_loss + loss) / period as f64;
            true
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
            true
        };

        let rsi = if !valid {
            0.0
        } else if avg_loss == 0.0 && avg_gain == 0.0 {
            FLAT_RSI
        } else if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };

        values.push(IndicatorPoint {
            date: window[1].date,
            valid,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
