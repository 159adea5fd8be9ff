//! Shortlist ranking.
//!
//! Passing results are scored, sorted by score descending with ties broken by
//! symbol ascending, and cut to the top K. The order is total, so identical
//! inputs always give identical shortlists whatever order they arrive in.

use crate::domain::screening::ScreeningResult;
use crate::domain::snapshot::IndicatorSnapshot;
use std::cmp::Ordering;

pub const DEFAULT_VOLUME_RATIO_WEIGHT: f64 = 0.5;
pub const DEFAULT_TURNOVER_WEIGHT: f64 = 0.3;
pub const DEFAULT_MFI_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreMethod {
    VolumeRatio,
    Turnover,
    Composite {
        volume_ratio_weight: f64,
        turnover_weight: f64,
        mfi_weight: f64,
    },
}

impl ScoreMethod {
    pub fn composite_default() -> Self {
        ScoreMethod::Composite {
            volume_ratio_weight: DEFAULT_VOLUME_RATIO_WEIGHT,
            turnover_weight: DEFAULT_TURNOVER_WEIGHT,
            mfi_weight: DEFAULT_MFI_WEIGHT,
        }
    }

    pub fn score(&self, snapshot: &IndicatorSnapshot) -> f64 {
        let raw = match self {
            ScoreMethod::VolumeRatio => snapshot.volume_ratio,
            ScoreMethod::Turnover => snapshot.turnover(),
            ScoreMethod::Composite {
                volume_ratio_weight,
                turnover_weight,
                mfi_weight,
            } => {
                volume_ratio_weight * snapshot.volume_ratio
                    + turnover_weight * snapshot.turnover().max(0.0).ln_1p() / std::f64::consts::LN_10
                    + mfi_weight * snapshot.mfi / 100.0
            }
        };
        if raw.is_finite() { raw } else { 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankConfig {
    pub method: ScoreMethod,
    /// `None` keeps every passing symbol.
    pub top_k: Option<usize>,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            method: ScoreMethod::VolumeRatio,
            top_k: Some(10),
        }
    }
}

/// Descending score, then ascending symbol.
pub fn rank_order(a: &ScreeningResult, b: &ScreeningResult) -> Ordering {
    b.rank_score
        .total_cmp(&a.rank_score)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

pub fn select(results: &[ScreeningResult], config: &RankConfig) -> Vec<ScreeningResult> {
    let mut passing: Vec<ScreeningResult> = results.iter().filter(|r| r.passed).cloned().collect();
    passing.sort_by(rank_order);
    if let Some(k) = config.top_k {
        passing.truncate(k);
    }
    passing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule_eval::StatusLabel;
    use crate::domain::snapshot::{RelativeStrength, TrendFlag};
    use chrono::NaiveDate;

    fn snap(volume_ratio: f64, close: f64, volume: i64, mfi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            close,
            volume,
            sma: close,
            volume_sma: 1.0,
            volume_ratio,
            mfi,
            rsi: 50.0,
            macd: None,
            trend: TrendFlag::Below,
            relative_strength: RelativeStrength::Unavailable,
            period_return_pct: 0.0,
        }
    }

    fn result(symbol: &str, score: f64, passed: bool) -> ScreeningResult {
        ScreeningResult {
            symbol: symbol.to_string(),
            reference_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            snapshot: snap(score, 100.0, 1000, 50.0),
            passed,
            failed_rules: Vec::new(),
            status: StatusLabel::Neutral,
            rank_score: score,
        }
    }

    fn symbols(list: &[ScreeningResult]) -> Vec<&str> {
        list.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn sorts_descending_and_breaks_ties_by_symbol() {
        let results = vec![
            result("TLKM", 2.0, true),
            result("ASII", 3.0, true),
            result("BBRI", 2.0, true),
            result("BBCA", 2.0, true),
        ];
        let top = select(&results, &RankConfig { method: ScoreMethod::VolumeRatio, top_k: None });
        assert_eq!(symbols(&top), vec!["ASII", "BBCA", "BBRI", "TLKM"]);
    }

    #[test]
    fn excludes_failing_results() {
        let results = vec![result("AAAA", 9.0, false), result("BBBB", 1.0, true)];
        let top = select(&results, &RankConfig::default());
        assert_eq!(symbols(&top), vec!["BBBB"]);
    }

    #[test]
    fn truncates_to_k() {
        let results: Vec<ScreeningResult> = (0..20)
            .map(|i| result(&format!("S{:02}", i), i as f64, true))
            .collect();
        let top = select(&results, &RankConfig { method: ScoreMethod::VolumeRatio, top_k: Some(3) });
        assert_eq!(symbols(&top), vec!["S19", "S18", "S17"]);

        let none = select(&results, &RankConfig { method: ScoreMethod::VolumeRatio, top_k: Some(0) });
        assert!(none.is_empty());
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut results = vec![
            result("CCCC", 1.0, true),
            result("AAAA", 1.0, true),
            result("BBBB", 5.0, true),
        ];
        let config = RankConfig::default();
        let first = select(&results, &config);
        results.reverse();
        let second = select(&results, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn turnover_score() {
        let s = snap(1.0, 500.0, 2_000, 50.0);
        assert_eq!(ScoreMethod::Turnover.score(&s), 1_000_000.0);
    }

    #[test]
    fn composite_score_combines_components() {
        let s = snap(2.0, 100.0, 9_999, 80.0);
        // turnover 999_900 -> log10(1 + 999_900) = 6 (approximately)
        let score = ScoreMethod::composite_default().score(&s);
        let expected = 0.5 * 2.0 + 0.3 * (1.0f64 + 999_900.0).log10() + 0.2 * 0.8;
        approx::assert_relative_eq!(score, expected, epsilon = 1e-9);
    }
}
