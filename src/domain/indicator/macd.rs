//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::indicator::ema::smooth;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let line: Vec<f64> = smooth(&closes, fast)
        .into_iter()
        .zip(smooth(&closes, slow))
        .map(|(f, s)| f.unwrap_or(0.0) - s.unwrap_or(0.0))
        .collect();

    // the signal EMA starts once both averages exist
    let line_start = fast.max(slow) - 1;
    let mut signal = vec![None; bars.len()];
    if line_start < bars.len() {
        for (slot, value) in signal[line_start..]
            .iter_mut()
            .zip(smooth(&line[line_start..], signal_period))
        {
            *slot = value;
        }
    }

    let values = bars
        .iter()
        .zip(line.iter().zip(&signal))
        .map(|(bar, (&line, signal))| {
            let signal_value = signal.unwrap_or(0.0);
            IndicatorPoint {
                date: bar.date,
                valid: signal.is_some(),
                value: IndicatorValue::Macd {
                    line,
                    signal: signal_value,
                    histogram: line - signal_value,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
