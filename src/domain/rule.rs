//! Screening rule configuration.
//!
//! A [`RuleConfig`] is a typed record of optional thresholds; every field left
//! unset is a pass-through rule. Profiles live in `[profile.<name>]` sections
//! of the INI config and are validated when read, so an unknown key or a bad
//! threshold fails the run before any symbol is touched.

use crate::domain::error::ArascanError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_PROFILE: &str = "default";

/// Keys accepted inside a profile section.
pub const RULE_KEYS: &[&str] = &[
    "min_price",
    "max_price",
    "min_volume_ma",
    "max_price_vs_ma_pct",
    "min_vol_ratio",
    "max_free_float_pct",
    "rsi_band",
    "mfi_band",
    "require_macd_bullish",
    "require_above_ma",
    "require_outperform",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleConfig {
    pub name: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_volume_ma: Option<f64>,
    pub max_price_vs_ma_pct: Option<f64>,
    pub min_vol_ratio: Option<f64>,
    pub max_free_float_pct: Option<f64>,
    pub rsi_band: Option<Band>,
    pub mfi_band: Option<Band>,
    pub require_macd_bullish: bool,
    pub require_above_ma: bool,
    pub require_outperform: bool,
}

/// Named rules, used in evaluation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleName {
    MinPrice,
    MaxPrice,
    MinVolumeMa,
    MaxPriceVsMaPct,
    MinVolRatio,
    MaxFreeFloatPct,
    RsiBand,
    MfiBand,
    MacdBullish,
    AboveMa,
    Outperform,
}

impl RuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::MinPrice => "min_price",
            RuleName::MaxPrice => "max_price",
            RuleName::MinVolumeMa => "min_volume_ma",
            RuleName::MaxPriceVsMaPct => "max_price_vs_ma_pct",
            RuleName::MinVolRatio => "min_vol_ratio",
            RuleName::MaxFreeFloatPct => "max_free_float_pct",
            RuleName::RsiBand => "rsi_band",
            RuleName::MfiBand => "mfi_band",
            RuleName::MacdBullish => "require_macd_bullish",
            RuleName::AboveMa => "require_above_ma",
            RuleName::Outperform => "require_outperform",
        }
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn profile_section(name: &str) -> String {
    format!("profile.{}", name.trim().to_lowercase())
}

impl RuleConfig {
    /// Read and validate the `[profile.<name>]` section.
    pub fn from_profile(config: &dyn ConfigPort, name: &str) -> Result<Self, ArascanError> {
        let section = profile_section(name);
        if !config.has_section(&section) {
            return Err(ArascanError::missing(&section, "*"));
        }

        for key in config.keys(&section) {
            if !RULE_KEYS.contains(&key.as_str()) {
                return Err(ArascanError::invalid(&section, &key, "unknown rule"));
            }
        }

        let rules = RuleConfig {
            name: name.trim().to_lowercase(),
            min_price: read_number(config, &section, "min_price")?,
            max_price: read_number(config, &section, "max_price")?,
            min_volume_ma: read_number(config, &section, "min_volume_ma")?,
            max_price_vs_ma_pct: read_number(config, &section, "max_price_vs_ma_pct")?,
            min_vol_ratio: read_number(config, &section, "min_vol_ratio")?,
            max_free_float_pct: read_number(config, &section, "max_free_float_pct")?,
            rsi_band: read_band(config, &section, "rsi_band")?,
            mfi_band: read_band(config, &section, "mfi_band")?,
            require_macd_bullish: read_flag(config, &section, "require_macd_bullish")?,
            require_above_ma: read_flag(config, &section, "require_above_ma")?,
            require_outperform: read_flag(config, &section, "require_outperform")?,
        };
        rules.validate()?;
        Ok(rules)
    }

    /// Cross-field checks; also used for configs built in code.
    pub fn validate(&self) -> Result<(), ArascanError> {
        let section = profile_section(&self.name);
        let non_negative = [
            ("min_price", self.min_price),
            ("max_price", self.max_price),
            ("min_volume_ma", self.min_volume_ma),
            ("min_vol_ratio", self.min_vol_ratio),
        ];
        for (key, value) in non_negative {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ArascanError::invalid(&section, key, "must be a non-negative number"));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_price, self.max_price) {
            if lo > hi {
                return Err(ArascanError::invalid(&section, "min_price", "min_price exceeds max_price"));
            }
        }
        if let Some(v) = self.max_free_float_pct {
            if !(0.0..=100.0).contains(&v) {
                return Err(ArascanError::invalid(&section, "max_free_float_pct", "must be between 0 and 100"));
            }
        }
        if let Some(v) = self.max_price_vs_ma_pct {
            if !v.is_finite() {
                return Err(ArascanError::invalid(&section, "max_price_vs_ma_pct", "must be finite"));
            }
        }
        for (key, band) in [("rsi_band", self.rsi_band), ("mfi_band", self.mfi_band)] {
            if let Some(b) = band {
                if !(0.0..=100.0).contains(&b.lower) || !(0.0..=100.0).contains(&b.upper) || b.lower > b.upper {
                    return Err(ArascanError::invalid(&section, key, "expected lo,hi within 0..100 with lo <= hi"));
                }
            }
        }
        Ok(())
    }

    pub fn needs_benchmark(&self) -> bool {
        self.require_outperform
    }
}

fn read_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, ArascanError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ArascanError::invalid(section, key, format!("not a number: {raw}"))),
    }
}

fn read_flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<bool, ArascanError> {
    match config.get_string(section, key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            _ => Err(ArascanError::invalid(section, key, format!("not a boolean: {raw}"))),
        },
    }
}

fn read_band(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<Band>, ArascanError> {
    let Some(raw) = config.get_string(section, key).filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [lo, hi] => match (lo.parse::<f64>(), hi.parse::<f64>()) {
            (Ok(lower), Ok(upper)) => Ok(Some(Band { lower, upper })),
            _ => Err(ArascanError::invalid(section, key, format!("not a number pair: {raw}"))),
        },
        _ => Err(ArascanError::invalid(section, key, format!("expected lo,hi: {raw}"))),
    }
}
