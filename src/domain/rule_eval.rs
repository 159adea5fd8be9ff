//! Rule evaluation and status labelling.
//!
//! # Evaluation Semantics
//!
//! - Each configured rule is an independent predicate over the snapshot
//! - `passed` is the AND of all configured rules; unset rules do not vote
//! - A rule that needs reference data the provider lacks evaluates to `false`
//! - The status label is picked by priority, first match wins:
//!   `StrongSignal` > `Momentum` > `Neutral` > `Distribution`

use crate::domain::rule::{RuleConfig, RuleName};
use crate::domain::snapshot::{IndicatorSnapshot, RelativeStrength, TrendFlag};
use crate::ports::reference_port::ReferenceData;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub passed: bool,
    pub failed_rules: Vec<RuleName>,
}

pub fn evaluate(
    rules: &RuleConfig,
    snapshot: &IndicatorSnapshot,
    reference: Option<&ReferenceData>,
) -> Evaluation {
    let checks: [(RuleName, Option<bool>); 11] = [
        (RuleName::MinPrice, rules.min_price.map(|v| snapshot.close >= v)),
        (RuleName::MaxPrice, rules.max_price.map(|v| snapshot.close <= v)),
        (
            RuleName::MinVolumeMa,
            rules.min_volume_ma.map(|v| snapshot.volume_sma >= v),
        ),
        (
            RuleName::MaxPriceVsMaPct,
            rules
                .max_price_vs_ma_pct
                .map(|v| snapshot.sma > 0.0 && snapshot.price_vs_ma_pct() <= v),
        ),
        (
            RuleName::MinVolRatio,
            rules.min_vol_ratio.map(|v| snapshot.volume_ratio >= v),
        ),
        (
            RuleName::MaxFreeFloatPct,
            rules.max_free_float_pct.map(|v| {
                reference
                    .and_then(|r| r.free_float_pct)
                    .is_some_and(|ff| ff <= v)
            }),
        ),
        (RuleName::RsiBand, rules.rsi_band.map(|b| b.contains(snapshot.rsi))),
        (RuleName::MfiBand, rules.mfi_band.map(|b| b.contains(snapshot.mfi))),
        (
            RuleName::MacdBullish,
            rules.require_macd_bullish.then(|| snapshot.macd_bullish()),
        ),
        (
            RuleName::AboveMa,
            rules
                .require_above_ma
                .then(|| snapshot.trend == TrendFlag::Above),
        ),
        (
            RuleName::Outperform,
            rules
                .require_outperform
                .then(|| snapshot.relative_strength == RelativeStrength::Outperform),
        ),
    ];

    let failed_rules: Vec<RuleName> = checks
        .iter()
        .filter(|(_, outcome)| *outcome == Some(false))
        .map(|(name, _)| *name)
        .collect();

    Evaluation {
        passed: failed_rules.is_empty(),
        failed_rules,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusLabel {
    StrongSignal,
    Momentum,
    Neutral,
    Distribution,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusLabel::StrongSignal => "Strong Signal",
            StatusLabel::Momentum => "Momentum",
            StatusLabel::Neutral => "Neutral",
            StatusLabel::Distribution => "Distribution",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelThresholds {
    pub strong_vol_ratio: f64,
    pub strong_mfi: f64,
    pub momentum_vol_ratio: f64,
    pub distribution_mfi: f64,
}

impl Default for LabelThresholds {
    fn default() -> Self {
        Self {
            strong_vol_ratio: 2.0,
            strong_mfi: 60.0,
            momentum_vol_ratio: 1.5,
            distribution_mfi: 40.0,
        }
    }
}

pub fn classify(snapshot: &IndicatorSnapshot, thresholds: &LabelThresholds) -> StatusLabel {
    let above = snapshot.trend == TrendFlag::Above;
    let bullish = snapshot.macd_bullish();

    if above
        && bullish
        && snapshot.volume_ratio >= thresholds.strong_vol_ratio
        && snapshot.mfi >= thresholds.strong_mfi
    {
        StatusLabel::StrongSignal
    } else if above && (bullish || snapshot.volume_ratio >= thresholds.momentum_vol_ratio) {
        StatusLabel::Momentum
    } else if snapshot.mfi >= thresholds.distribution_mfi {
        StatusLabel::Neutral
    } else {
        StatusLabel::Distribution
    }
}
