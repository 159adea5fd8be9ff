//! Indicator snapshot for one symbol at one reference date.
//!
//! The caller hands over a history slice that already ends at the reference
//! date (see [`crate::domain::series_store::SeriesStore::history`]); nothing
//! here can reach bars after it.

use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{
    calculate_macd, calculate_mfi, calculate_rsi, calculate_sma, calculate_volume_sma,
    IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::SkipReason;
use chrono::NaiveDate;

/// Fallback for MFI and RSI when the window is not yet filled.
pub const NEUTRAL_OSCILLATOR: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub sma_period: usize,
    pub volume_period: usize,
    pub mfi_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rs_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_period: 20,
            volume_period: 20,
            mfi_period: 14,
            rsi_period: 14,
            macd_fast: DEFAULT_FAST,
            macd_slow: DEFAULT_SLOW,
            macd_signal: DEFAULT_SIGNAL,
            rs_period: 20,
        }
    }
}

impl IndicatorParams {
    /// Bars needed before a snapshot is produced. MFI, RSI and MACD have
    /// defined fallbacks and do not raise the minimum.
    pub fn min_history(&self) -> usize {
        self.sma_period.max(self.volume_period).max(self.rs_period + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdReading {
    pub fn is_bullish(&self) -> bool {
        self.histogram > 0.0 && self.line > self.signal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendFlag {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeStrength {
    Outperform,
    Underperform,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub sma: f64,
    pub volume_sma: f64,
    pub volume_ratio: f64,
    pub mfi: f64,
    pub rsi: f64,
    pub macd: Option<MacdReading>,
    pub trend: TrendFlag,
    pub relative_strength: RelativeStrength,
    /// Symbol return over the relative strength window, percent.
    pub period_return_pct: f64,
}

impl IndicatorSnapshot {
    pub fn macd_bullish(&self) -> bool {
        self.macd.is_some_and(|m| m.is_bullish())
    }

    pub fn turnover(&self) -> f64 {
        self.close * self.volume as f64
    }

    /// Percent distance of close above the moving average.
    pub fn price_vs_ma_pct(&self) -> f64 {
        if self.sma > 0.0 {
            (self.close - self.sma) / self.sma * 100.0
        } else {
            0.0
        }
    }
}

/// Compute the snapshot from `history` (bars up to the reference date).
/// `benchmark` is the index history cut at the same date, if configured.
pub fn compute_snapshot(
    history: &[OhlcvBar],
    benchmark: Option<&[OhlcvBar]>,
    params: &IndicatorParams,
) -> Result<IndicatorSnapshot, SkipReason> {
    let minimum = params.min_history();
    let Some(last) = history.last() else {
        return Err(SkipReason::NoData);
    };
    if history.len() < minimum {
        return Err(SkipReason::InsufficientHistory {
            bars: history.len(),
            minimum,
        });
    }

    let sma = calculate_sma(history, params.sma_period)
        .latest_simple()
        .ok_or(SkipReason::InsufficientHistory {
            bars: history.len(),
            minimum,
        })?;
    let volume_sma = calculate_volume_sma(history, params.volume_period)
        .latest_simple()
        .ok_or(SkipReason::InsufficientHistory {
            bars: history.len(),
            minimum,
        })?;

    let volume_ratio = if volume_sma > 0.0 {
        last.volume as f64 / volume_sma
    } else {
        0.0
    };

    let mfi = calculate_mfi(history, params.mfi_period)
        .latest_simple()
        .unwrap_or(NEUTRAL_OSCILLATOR);
    let rsi = calculate_rsi(history, params.rsi_period)
        .latest_simple()
        .unwrap_or(NEUTRAL_OSCILLATOR);

    let macd = match calculate_macd(history, params.macd_fast, params.macd_slow, params.macd_signal)
        .latest()
    {
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => Some(MacdReading {
            line,
            signal,
            histogram,
        }),
        _ => None,
    };

    let trend = if last.close > sma {
        TrendFlag::Above
    } else {
        TrendFlag::Below
    };

    let window_start = &history[history.len() - 1 - params.rs_period];
    let period_return_pct = pct_change(window_start.close, last.close).unwrap_or(0.0);
    let relative_strength = relative_strength(window_start, last, benchmark);

    Ok(IndicatorSnapshot {
        date: last.date,
        close: last.close,
        volume: last.volume,
        sma,
        volume_sma,
        volume_ratio,
        mfi,
        rsi,
        macd,
        trend,
        relative_strength,
        period_return_pct,
    })
}

fn relative_strength(
    start: &OhlcvBar,
    end: &OhlcvBar,
    benchmark: Option<&[OhlcvBar]>,
) -> RelativeStrength {
    let Some(benchmark) = benchmark else {
        return RelativeStrength::Unavailable;
    };
    let symbol_return = pct_change(start.close, end.close);
    let bench_return = match (
        close_on_or_before(benchmark, start.date),
        close_on_or_before(benchmark, end.date),
    ) {
        (Some(from), Some(to)) => pct_change(from, to),
        _ => None,
    };

    match (symbol_return, bench_return) {
        (Some(s), Some(b)) if s > b => RelativeStrength::Outperform,
        (Some(_), Some(_)) => RelativeStrength::Underperform,
        _ => RelativeStrength::Unavailable,
    }
}

fn close_on_or_before(bars: &[OhlcvBar], date: NaiveDate) -> Option<f64> {
    let end = bars.partition_point(|b| b.date <= date);
    end.checked_sub(1).map(|i| bars[i].close)
}

fn pct_change(from: f64, to: f64) -> Option<f64> {
    (from > 0.0).then(|| (to - from) / from * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn bars_from(closes: &[f64], volumes: &[i64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| OhlcvBar {
                code: "TEST".into(),
                date: start() + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect()
    }

    fn flat(n: usize, close: f64, volume: i64) -> Vec<OhlcvBar> {
        bars_from(&vec![close; n], &vec![volume; n])
    }

    #[test]
    fn insufficient_history_is_skipped() {
        let params = IndicatorParams::default();
        let result = compute_snapshot(&flat(10, 100.0, 1000), None, &params);
        assert_eq!(
            result,
            Err(SkipReason::InsufficientHistory {
                bars: 10,
                minimum: 21
            })
        );
    }

    #[test]
    fn empty_history_is_no_data() {
        let result = compute_snapshot(&[], None, &IndicatorParams::default());
        assert_eq!(result, Err(SkipReason::NoData));
    }

    #[test]
    fn short_history_uses_neutral_oscillators_and_no_macd() {
        let snap = compute_snapshot(&flat(25, 100.0, 1000), None, &IndicatorParams::default())
            .unwrap();
        // flat data: MFI has no negative flow and reads 100, RSI is 0/0
        // and reads neutral
        assert_eq!(snap.mfi, 100.0);
        assert_eq!(snap.rsi, NEUTRAL_OSCILLATOR);
        assert!(snap.macd.is_none());
        assert!(!snap.macd_bullish());
    }

    #[test]
    fn neutral_fallback_when_oscillator_window_larger() {
        let params = IndicatorParams {
            mfi_period: 40,
            rsi_period: 40,
            ..IndicatorParams::default()
        };
        let snap = compute_snapshot(&flat(25, 100.0, 1000), None, &params).unwrap();
        assert_eq!(snap.mfi, NEUTRAL_OSCILLATOR);
        assert_eq!(snap.rsi, NEUTRAL_OSCILLATOR);
    }

    #[test]
    fn volume_ratio_zero_when_volume_sma_zero() {
        let snap = compute_snapshot(&flat(30, 100.0, 0), None, &IndicatorParams::default())
            .unwrap();
        assert_eq!(snap.volume_ratio, 0.0);
    }

    #[test]
    fn volume_ratio_against_average() {
        let mut volumes = vec![1000; 30];
        volumes[29] = 4000;
        let snap = compute_snapshot(&bars_from(&[100.0; 30], &volumes), None, &IndicatorParams::default())
            .unwrap();
        // average over last 20 bars = (19 * 1000 + 4000) / 20 = 1150
        approx::assert_relative_eq!(snap.volume_ratio, 4000.0 / 1150.0, epsilon = 1e-12);
    }

    #[test]
    fn trend_flag_follows_close_vs_sma() {
        let mut closes = vec![100.0; 30];
        closes[29] = 120.0;
        let snap = compute_snapshot(&bars_from(&closes, &[1000; 30]), None, &IndicatorParams::default())
            .unwrap();
        assert_eq!(snap.trend, TrendFlag::Above);
        assert!(snap.price_vs_ma_pct() > 0.0);

        let snap = compute_snapshot(&flat(30, 100.0, 1000), None, &IndicatorParams::default())
            .unwrap();
        assert_eq!(snap.trend, TrendFlag::Below);
    }

    #[test]
    fn macd_present_with_enough_history() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snap = compute_snapshot(&bars_from(&closes, &[1000; 60]), None, &IndicatorParams::default())
            .unwrap();
        assert!(snap.macd.is_some());
    }

    #[test]
    fn relative_strength_against_benchmark() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let symbol = bars_from(&closes, &[1000; 30]);
        let flat_bench = flat(30, 1000.0, 0);
        let snap = compute_snapshot(&symbol, Some(&flat_bench), &IndicatorParams::default())
            .unwrap();
        assert_eq!(snap.relative_strength, RelativeStrength::Outperform);

        let hot: Vec<f64> = (0..30).map(|i| 1000.0 * 1.05f64.powi(i)).collect();
        let hot_bench = bars_from(&hot, &[0; 30]);
        let snap = compute_snapshot(&symbol, Some(&hot_bench), &IndicatorParams::default())
            .unwrap();
        assert_eq!(snap.relative_strength, RelativeStrength::Underperform);
    }

    #[test]
    fn relative_strength_unavailable_without_benchmark_window() {
        let symbol = flat(30, 100.0, 1000);
        let snap = compute_snapshot(&symbol, None, &IndicatorParams::default()).unwrap();
        assert_eq!(snap.relative_strength, RelativeStrength::Unavailable);

        // benchmark starts after the window start
        let late: Vec<OhlcvBar> = flat(30, 100.0, 1000).into_iter().skip(25).collect();
        let snap = compute_snapshot(&symbol, Some(&late), &IndicatorParams::default()).unwrap();
        assert_eq!(snap.relative_strength, RelativeStrength::Unavailable);
    }

    #[test]
    fn period_return_uses_rs_window() {
        let closes: Vec<f64> = (0..30).map(|i| if i < 9 { 50.0 } else { 100.0 }).collect();
        let snap = compute_snapshot(&bars_from(&closes, &[1000; 30]), None, &IndicatorParams::default())
            .unwrap();
        // window start is bar 9 (close 100), last close 100
        assert_eq!(snap.period_return_pct, 0.0);
    }
}
