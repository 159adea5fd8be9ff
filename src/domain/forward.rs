//! Forward-return replay after a reference date.
//!
//! # Replay Semantics
//!
//! - The entry price comes from the first bar after the reference date
//!   (`NextBarOpen`) or from the reference bar's close (`ReferenceClose`)
//! - Only bars strictly after the reference date are scanned; the window is
//!   bounded by calendar days or by a bar count
//! - Daily move is measured close to close; the first forward bar is
//!   compared with the last close at or before the reference date, so a
//!   gap up at the open still counts. Cumulative move is measured against
//!   the entry price
//! - The first bar whose daily move reaches its ARA band minus epsilon is the
//!   trigger; the band is picked from the prior close, not the entry price
//! - Without a trigger the peak cumulative move decides the outcome
//! - An empty window is `NoData`, never `Fail`

use crate::domain::error::ArascanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::screening::with_pool;
use crate::domain::series_store::SeriesStore;
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

pub const DEFAULT_HORIZON_DAYS: u32 = 30;
pub const DEFAULT_SUCCESS_THRESHOLD_PCT: f64 = 10.0;
pub const DEFAULT_EPSILON_PCT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPolicy {
    #[default]
    NextBarOpen,
    ReferenceClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
    #[default]
    CalendarDays,
    TradingBars,
}

/// Tiered daily limit-up bands keyed by the prior close.
#[derive(Debug, Clone, PartialEq)]
pub struct AraBands {
    /// Prices strictly below this use `low_pct`.
    pub low_price_limit: f64,
    /// Prices up to and including this use `mid_pct`; above it `high_pct`.
    pub high_price_limit: f64,
    pub low_pct: f64,
    pub mid_pct: f64,
    pub high_pct: f64,
}

impl Default for AraBands {
    fn default() -> Self {
        Self {
            low_price_limit: 200.0,
            high_price_limit: 5000.0,
            low_pct: 35.0,
            mid_pct: 25.0,
            high_pct: 20.0,
        }
    }
}

impl AraBands {
    pub fn band(&self, prior_close: f64) -> f64 {
        if prior_close < self.low_price_limit {
            self.low_pct
        } else if prior_close <= self.high_price_limit {
            self.mid_pct
        } else {
            self.high_pct
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub horizon_days: u32,
    pub success_threshold_pct: f64,
    pub epsilon_pct: f64,
    pub entry: EntryPolicy,
    pub window: WindowPolicy,
    pub bands: AraBands,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            success_threshold_pct: DEFAULT_SUCCESS_THRESHOLD_PCT,
            epsilon_pct: DEFAULT_EPSILON_PCT,
            entry: EntryPolicy::default(),
            window: WindowPolicy::default(),
            bands: AraBands::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ArascanError> {
        if self.horizon_days == 0 {
            return Err(ArascanError::invalid("backtest", "horizon_days", "must be positive"));
        }
        if !self.success_threshold_pct.is_finite() {
            return Err(ArascanError::invalid("backtest", "success_threshold", "must be finite"));
        }
        if !self.epsilon_pct.is_finite() || self.epsilon_pct < 0.0 {
            return Err(ArascanError::invalid("backtest", "epsilon", "must be a non-negative number"));
        }
        let b = &self.bands;
        if !(b.low_price_limit > 0.0 && b.low_price_limit <= b.high_price_limit) {
            return Err(ArascanError::invalid("backtest", "ara_price_limits", "expected 0 < low <= high"));
        }
        for pct in [b.low_pct, b.mid_pct, b.high_pct] {
            if !pct.is_finite() || pct <= 0.0 {
                return Err(ArascanError::invalid("backtest", "ara_bands", "bands must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeLabel {
    Success,
    Fail,
    NoData,
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeLabel::Success => "Success",
            OutcomeLabel::Fail => "Fail",
            OutcomeLabel::NoData => "NoData",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub symbol: String,
    pub reference_date: NaiveDate,
    pub buy_date: Option<NaiveDate>,
    pub entry_price: Option<f64>,
    pub horizon_days: u32,
    /// Bars scanned in the forward window.
    pub window_bars: usize,
    /// First limit-up touch.
    pub trigger_date: Option<NaiveDate>,
    pub trigger_move_pct: Option<f64>,
    /// Bar with the highest cumulative move (earliest on ties).
    pub peak_date: Option<NaiveDate>,
    pub peak_return_pct: Option<f64>,
    pub best_daily_move_pct: Option<f64>,
    /// Move compared against the success threshold.
    pub evaluated_return_pct: Option<f64>,
    pub label: OutcomeLabel,
}

impl BacktestOutcome {
    fn no_data(symbol: &str, reference_date: NaiveDate, horizon_days: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            reference_date,
            buy_date: None,
            entry_price: None,
            horizon_days,
            window_bars: 0,
            trigger_date: None,
            trigger_move_pct: None,
            peak_date: None,
            peak_return_pct: None,
            best_daily_move_pct: None,
            evaluated_return_pct: None,
            label: OutcomeLabel::NoData,
        }
    }

    pub fn triggered(&self) -> bool {
        self.trigger_date.is_some()
    }
}

fn pct_move(from: f64, to: f64) -> f64 {
    if from > 0.0 {
        (to - from) / from * 100.0
    } else {
        0.0
    }
}

/// Slice of `forward` inside the horizon.
fn window<'a>(forward: &'a [OhlcvBar], reference_date: NaiveDate, config: &BacktestConfig) -> &'a [OhlcvBar] {
    match config.window {
        WindowPolicy::CalendarDays => {
            let last_day = reference_date + Duration::days(i64::from(config.horizon_days));
            let end = forward.partition_point(|b| b.date <= last_day);
            &forward[..end]
        }
        WindowPolicy::TradingBars => {
            let end = forward.len().min(config.horizon_days as usize);
            &forward[..end]
        }
    }
}

/// Replay one symbol. `history` holds bars up to the reference date and
/// `forward` bars strictly after it, as returned by [`SeriesStore`].
pub fn replay(
    symbol: &str,
    history: &[OhlcvBar],
    forward: &[OhlcvBar],
    reference_date: NaiveDate,
    config: &BacktestConfig,
) -> BacktestOutcome {
    let bars = window(forward, reference_date, config);
    let Some(first) = bars.first() else {
        return BacktestOutcome::no_data(symbol, reference_date, config.horizon_days);
    };

    let (buy_date, entry_price) = match config.entry {
        EntryPolicy::NextBarOpen => (first.date, first.open),
        EntryPolicy::ReferenceClose => match history.last() {
            Some(bar) => (bar.date, bar.close),
            None => return BacktestOutcome::no_data(symbol, reference_date, config.horizon_days),
        },
    };

    let mut prior = history.last().map_or(entry_price, |bar| bar.close);
    let mut trigger: Option<(NaiveDate, f64)> = None;
    let mut peak: Option<(NaiveDate, f64)> = None;
    let mut best_daily = f64::NEG_INFINITY;

    for bar in bars {
        let daily = pct_move(prior, bar.close);
        let cumulative = pct_move(entry_price, bar.close);

        if trigger.is_none() && daily >= config.bands.band(prior) - config.epsilon_pct {
            trigger = Some((bar.date, daily));
        }
        if peak.is_none_or(|(_, best)| cumulative > best) {
            peak = Some((bar.date, cumulative));
        }
        best_daily = best_daily.max(daily);
        prior = bar.close;
    }

    let evaluated = match (trigger, peak) {
        (Some((_, daily)), _) => daily,
        (None, Some((_, cumulative))) => cumulative,
        (None, None) => 0.0,
    };
    let label = if evaluated >= config.success_threshold_pct {
        OutcomeLabel::Success
    } else {
        OutcomeLabel::Fail
    };

    BacktestOutcome {
        symbol: symbol.to_string(),
        reference_date,
        buy_date: Some(buy_date),
        entry_price: Some(entry_price),
        horizon_days: config.horizon_days,
        window_bars: bars.len(),
        trigger_date: trigger.map(|(d, _)| d),
        trigger_move_pct: trigger.map(|(_, m)| m),
        peak_date: peak.map(|(d, _)| d),
        peak_return_pct: peak.map(|(_, m)| m),
        best_daily_move_pct: Some(best_daily),
        evaluated_return_pct: Some(evaluated),
        label,
    }
}

/// Replay every symbol of `universe`, ordered by symbol. Symbols absent from
/// the store come back as `NoData`.
pub fn backtest(
    store: &SeriesStore,
    universe: &[String],
    reference_date: NaiveDate,
    config: &BacktestConfig,
    threads: usize,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<BacktestOutcome>, ArascanError> {
    config.validate()?;

    let mut codes: Vec<&String> = universe.iter().collect();
    codes.sort();
    codes.dedup();

    let outcomes: Vec<BacktestOutcome> = with_pool(threads, || {
        codes
            .par_iter()
            .filter(|_| !cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)))
            .map(|code| {
                replay(
                    code,
                    store.history(code, reference_date),
                    store.forward(code, reference_date),
                    reference_date,
                    config,
                )
            })
            .collect()
    })?;

    let count = |label: OutcomeLabel| outcomes.iter().filter(|o| o.label == label).count();
    info!(
        symbols = outcomes.len(),
        success = count(OutcomeLabel::Success),
        fail = count(OutcomeLabel::Fail),
        no_data = count(OutcomeLabel::NoData),
        horizon_days = config.horizon_days,
        "backtest complete"
    );

    Ok(outcomes)
}
