//! Win-rate aggregation over backtest outcomes.
//!
//! The shortlist and the full screened universe are summarised separately.
//! `NoData` outcomes are counted but never enter a win-rate denominator, and
//! a 0/0 rate is `None` rather than zero.

use crate::domain::forward::{BacktestOutcome, OutcomeLabel};
use crate::domain::screening::ScreeningResult;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinStats {
    pub success: usize,
    pub fail: usize,
    pub no_data: usize,
    pub win_rate: Option<f64>,
}

impl WinStats {
    fn from_labels<'a>(labels: impl Iterator<Item = &'a OutcomeLabel>) -> Self {
        let mut stats = WinStats::default();
        for label in labels {
            match label {
                OutcomeLabel::Success => stats.success += 1,
                OutcomeLabel::Fail => stats.fail += 1,
                OutcomeLabel::NoData => stats.no_data += 1,
            }
        }
        let decided = stats.success + stats.fail;
        stats.win_rate = (decided > 0).then(|| stats.success as f64 / decided as f64);
        stats
    }

    pub fn total(&self) -> usize {
        self.success + self.fail + self.no_data
    }

    /// Win rate in percent, if defined.
    pub fn win_rate_pct(&self) -> Option<f64> {
        self.win_rate.map(|r| r * 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub shortlist: WinStats,
    pub universe: WinStats,
}

/// Summarise `outcomes` for the shortlist and for every processed symbol in
/// `results`. Outcomes for symbols that were not screened are ignored.
pub fn summarize(
    results: &[ScreeningResult],
    shortlist: &[ScreeningResult],
    outcomes: &[BacktestOutcome],
) -> Summary {
    let by_symbol: HashMap<&str, &OutcomeLabel> = outcomes
        .iter()
        .map(|o| (o.symbol.as_str(), &o.label))
        .collect();

    let collect = |set: &[ScreeningResult]| -> WinStats {
        let symbols: HashSet<&str> = set.iter().map(|r| r.symbol.as_str()).collect();
        WinStats::from_labels(symbols.into_iter().filter_map(|s| by_symbol.get(s).copied()))
    };

    Summary {
        shortlist: collect(shortlist),
        universe: collect(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule_eval::StatusLabel;
    use crate::domain::snapshot::{IndicatorSnapshot, RelativeStrength, TrendFlag};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn result(symbol: &str, passed: bool) -> ScreeningResult {
        ScreeningResult {
            symbol: symbol.to_string(),
            reference_date: date(),
            snapshot: IndicatorSnapshot {
                date: date(),
                close: 100.0,
                volume: 1000,
                sma: 100.0,
                volume_sma: 1000.0,
                volume_ratio: 1.0,
                mfi: 50.0,
                rsi: 50.0,
                macd: None,
                trend: TrendFlag::Below,
                relative_strength: RelativeStrength::Unavailable,
                period_return_pct: 0.0,
            },
            passed,
            failed_rules: Vec::new(),
            status: StatusLabel::Neutral,
            rank_score: 1.0,
        }
    }

    fn outcome(symbol: &str, label: OutcomeLabel) -> BacktestOutcome {
        BacktestOutcome {
            symbol: symbol.to_string(),
            reference_date: date(),
            buy_date: None,
            entry_price: None,
            horizon_days: 30,
            window_bars: 0,
            trigger_date: None,
            trigger_move_pct: None,
            peak_date: None,
            peak_return_pct: None,
            best_daily_move_pct: None,
            evaluated_return_pct: None,
            label,
        }
    }

    #[test]
    fn shortlist_and_universe_are_separate() {
        let results = vec![
            result("AAAA", true),
            result("BBBB", true),
            result("CCCC", false),
            result("DDDD", false),
        ];
        let shortlist = vec![results[0].clone(), results[1].clone()];
        let outcomes = vec![
            outcome("AAAA", OutcomeLabel::Success),
            outcome("BBBB", OutcomeLabel::Fail),
            outcome("CCCC", OutcomeLabel::Fail),
            outcome("DDDD", OutcomeLabel::Fail),
        ];
        let summary = summarize(&results, &shortlist, &outcomes);

        assert_eq!(summary.shortlist.success, 1);
        assert_eq!(summary.shortlist.fail, 1);
        assert_relative_eq!(summary.shortlist.win_rate.unwrap(), 0.5);
        assert_eq!(summary.universe.total(), 4);
        assert_relative_eq!(summary.universe.win_rate.unwrap(), 0.25);
        assert_relative_eq!(summary.universe.win_rate_pct().unwrap(), 25.0);
    }

    #[test]
    fn empty_shortlist_has_undefined_rate() {
        let results = vec![result("AAAA", false)];
        let outcomes = vec![outcome("AAAA", OutcomeLabel::Fail)];
        let summary = summarize(&results, &[], &outcomes);
        assert_eq!(summary.shortlist, WinStats::default());
        assert_eq!(summary.shortlist.win_rate, None);
        assert_eq!(summary.universe.win_rate, Some(0.0));
    }

    #[test]
    fn no_data_is_counted_outside_denominator() {
        let results = vec![result("AAAA", true), result("BBBB", true)];
        let outcomes = vec![
            outcome("AAAA", OutcomeLabel::Success),
            outcome("BBBB", OutcomeLabel::NoData),
        ];
        let summary = summarize(&results, &results, &outcomes);
        assert_eq!(summary.universe.no_data, 1);
        assert_eq!(summary.universe.win_rate, Some(1.0));

        let only_no_data = vec![outcome("AAAA", OutcomeLabel::NoData), outcome("BBBB", OutcomeLabel::NoData)];
        let summary = summarize(&results, &results, &only_no_data);
        assert_eq!(summary.universe.win_rate, None);
        assert_eq!(summary.universe.no_data, 2);
    }

    #[test]
    fn outcomes_for_unscreened_symbols_are_ignored() {
        let results = vec![result("AAAA", true)];
        let outcomes = vec![
            outcome("AAAA", OutcomeLabel::Success),
            outcome("SKIP", OutcomeLabel::Fail),
        ];
        let summary = summarize(&results, &results, &outcomes);
        assert_eq!(summary.universe.total(), 1);
        assert_eq!(summary.universe.win_rate, Some(1.0));
    }
}
