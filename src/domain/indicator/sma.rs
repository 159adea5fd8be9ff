//! Simple moving averages of close and volume.
//!
//! SMA[i] = mean of the last n values ending at i, rolling sum.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::Sma(period), |b| b.close)
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::VolumeSma(period), |b| {
        b.volume as f64
    })
}

fn rolling_mean(
    bars: &[OhlcvBar],
    period: usize,
    indicator_type: IndicatorType,
    field: impl Fn(&OhlcvBar) -> f64,
) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::invalid(indicator_type, bars.iter().map(|b| b.date));
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += field(bar);
        if i >= period {
            sum -= field(&bars[i - period]);
        }

        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(if valid { sum / period as f64 } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
