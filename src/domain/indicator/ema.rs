//! Exponential moving average of close.
//!
//! Seeded with the mean of the first n closes, then each bar moves the
//! average by alpha = 2/(n+1) of its distance to the close.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Ema(period);
    if period == 0 {
        return IndicatorSeries::invalid(indicator_type, bars.iter().map(|b| b.date));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .zip(smooth(&closes, period))
        .map(|(bar, ema)| IndicatorPoint {
            date: bar.date,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// EMA over raw values; `None` until `period` values have been seen.
pub(crate) fn smooth(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut seed_sum = 0.0;
    let mut current: Option<f64> = None;

    values
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            current = match current {
                Some(prev) => Some(prev + alpha * (x - prev)),
                None => {
                    seed_sum += x;
                    (i + 1 == period).then(|| seed_sum / period as f64)
                }
            };
            current
        })
        .collect()
}
