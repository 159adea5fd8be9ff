//! Configuration validation and typed settings.
//!
//! Every section is read and checked up front; a bad value fails the run
//! before any data is fetched. Unset keys fall back to the defaults of the
//! corresponding domain type.

use crate::domain::error::ArascanError;
use crate::domain::forward::{AraBands, BacktestConfig, EntryPolicy, WindowPolicy};
use crate::domain::ranking::{
    RankConfig, ScoreMethod, DEFAULT_MFI_WEIGHT, DEFAULT_TURNOVER_WEIGHT, DEFAULT_VOLUME_RATIO_WEIGHT,
};
use crate::domain::rule::{RuleConfig, DEFAULT_PROFILE};
use crate::domain::rule_eval::LabelThresholds;
use crate::domain::snapshot::IndicatorParams;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 120;
pub const DEFAULT_UNIVERSE_COLUMN: &str = "Kode Saham";
pub const DEFAULT_UNIVERSE_NAME_COLUMN: &str = "Nama Perusahaan";

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub dir: PathBuf,
    pub reference_file: Option<PathBuf>,
    pub universe_file: Option<PathBuf>,
    pub universe_column: String,
    /// Company name column; optional in the file.
    pub universe_name_column: String,
    pub symbol_suffix: String,
    /// `0` disables the fetch cache.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSettings {
    pub reference_date: Option<NaiveDate>,
    pub lookback_days: u32,
    pub codes: Option<String>,
    pub benchmark: Option<String>,
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data: DataSettings,
    pub screen: ScreenSettings,
    pub indicators: IndicatorParams,
    pub rank: RankConfig,
    pub labels: LabelThresholds,
    pub backtest: BacktestConfig,
    pub threads: usize,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ArascanError> {
        let settings = Settings {
            data: data_settings(config)?,
            screen: screen_settings(config)?,
            indicators: indicator_params(config)?,
            rank: rank_config(config)?,
            labels: label_thresholds(config)?,
            backtest: backtest_config(config)?,
            threads: read_count(config, "engine", "threads")?.unwrap_or(0),
        };
        settings.backtest.validate()?;
        Ok(settings)
    }

    /// Rule set named by `[screen] profile`, or `override_name` when given.
    pub fn rules(&self, config: &dyn ConfigPort, override_name: Option<&str>) -> Result<RuleConfig, ArascanError> {
        let name = override_name.unwrap_or(&self.screen.profile);
        RuleConfig::from_profile(config, name)
    }
}

/// Validate the whole file, including the selected rule profile.
pub fn validate_config(config: &dyn ConfigPort) -> Result<Settings, ArascanError> {
    let settings = Settings::from_config(config)?;
    settings.rules(config, None)?;
    Ok(settings)
}

fn data_settings(config: &dyn ConfigPort) -> Result<DataSettings, ArascanError> {
    let dir = read_text(config, "data", "dir").ok_or_else(|| ArascanError::missing("data", "dir"))?;
    Ok(DataSettings {
        dir: PathBuf::from(dir),
        reference_file: read_text(config, "data", "reference_file").map(PathBuf::from),
        universe_file: read_text(config, "data", "universe_file").map(PathBuf::from),
        universe_column: read_text(config, "data", "universe_column")
            .unwrap_or_else(|| DEFAULT_UNIVERSE_COLUMN.to_string()),
        universe_name_column: read_text(config, "data", "universe_name_column")
            .unwrap_or_else(|| DEFAULT_UNIVERSE_NAME_COLUMN.to_string()),
        symbol_suffix: read_text(config, "data", "symbol_suffix").unwrap_or_default(),
        cache_ttl_secs: read_count(config, "data", "cache_ttl_secs")?.unwrap_or(0) as u64,
    })
}

fn screen_settings(config: &dyn ConfigPort) -> Result<ScreenSettings, ArascanError> {
    let reference_date = read_text(config, "screen", "reference_date")
        .map(|s| parse_date(&s, "screen", "reference_date"))
        .transpose()?;
    let lookback_days = match read_count(config, "screen", "lookback_days")? {
        Some(0) => return Err(ArascanError::invalid("screen", "lookback_days", "must be positive")),
        Some(n) => n as u32,
        None => DEFAULT_LOOKBACK_DAYS,
    };
    Ok(ScreenSettings {
        reference_date,
        lookback_days,
        codes: read_text(config, "screen", "codes"),
        benchmark: read_text(config, "screen", "benchmark"),
        profile: read_text(config, "screen", "profile").unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
    })
}

fn indicator_params(config: &dyn ConfigPort) -> Result<IndicatorParams, ArascanError> {
    let defaults = IndicatorParams::default();
    let period = |key: &str, default: usize| -> Result<usize, ArascanError> {
        match read_count(config, "indicators", key)? {
            Some(0) => Err(ArascanError::invalid("indicators", key, "period must be at least 1")),
            Some(n) => Ok(n),
            None => Ok(default),
        }
    };
    let params = IndicatorParams {
        sma_period: period("sma_period", defaults.sma_period)?,
        volume_period: period("volume_period", defaults.volume_period)?,
        mfi_period: period("mfi_period", defaults.mfi_period)?,
        rsi_period: period("rsi_period", defaults.rsi_period)?,
        macd_fast: period("macd_fast", defaults.macd_fast)?,
        macd_slow: period("macd_slow", defaults.macd_slow)?,
        macd_signal: period("macd_signal", defaults.macd_signal)?,
        rs_period: period("rs_period", defaults.rs_period)?,
    };
    if params.macd_fast >= params.macd_slow {
        return Err(ArascanError::invalid("indicators", "macd_fast", "must be shorter than macd_slow"));
    }
    Ok(params)
}

fn rank_config(config: &dyn ConfigPort) -> Result<RankConfig, ArascanError> {
    let method = match read_text(config, "rank", "method").map(|s| s.to_lowercase()).as_deref() {
        None | Some("volume_ratio") => ScoreMethod::VolumeRatio,
        Some("turnover") => ScoreMethod::Turnover,
        Some("composite") => {
            let weight = |key: &str, default: f64| -> Result<f64, ArascanError> {
                let w = read_float(config, "rank", key)?.unwrap_or(default);
                if w < 0.0 {
                    return Err(ArascanError::invalid("rank", key, "weight must be non-negative"));
                }
                Ok(w)
            };
            ScoreMethod::Composite {
                volume_ratio_weight: weight("volume_ratio_weight", DEFAULT_VOLUME_RATIO_WEIGHT)?,
                turnover_weight: weight("turnover_weight", DEFAULT_TURNOVER_WEIGHT)?,
                mfi_weight: weight("mfi_weight", DEFAULT_MFI_WEIGHT)?,
            }
        }
        Some(other) => {
            return Err(ArascanError::invalid(
                "rank",
                "method",
                format!("unknown method '{other}', expected volume_ratio, turnover or composite"),
            ))
        }
    };

    let top_k = match read_text(config, "rank", "top_k").map(|s| s.to_lowercase()).as_deref() {
        None => RankConfig::default().top_k,
        Some("all") => None,
        Some(_) => read_count(config, "rank", "top_k")?,
    };

    Ok(RankConfig { method, top_k })
}

fn label_thresholds(config: &dyn ConfigPort) -> Result<LabelThresholds, ArascanError> {
    let defaults = LabelThresholds::default();
    let value = |key: &str, default: f64| -> Result<f64, ArascanError> {
        let v = read_float(config, "labels", key)?.unwrap_or(default);
        if v < 0.0 {
            return Err(ArascanError::invalid("labels", key, "must be non-negative"));
        }
        Ok(v)
    };
    Ok(LabelThresholds {
        strong_vol_ratio: value("strong_vol_ratio", defaults.strong_vol_ratio)?,
        strong_mfi: value("strong_mfi", defaults.strong_mfi)?,
        momentum_vol_ratio: value("momentum_vol_ratio", defaults.momentum_vol_ratio)?,
        distribution_mfi: value("distribution_mfi", defaults.distribution_mfi)?,
    })
}

fn backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, ArascanError> {
    let defaults = BacktestConfig::default();

    let entry = match read_text(config, "backtest", "entry").map(|s| s.to_lowercase()).as_deref() {
        None | Some("next_open") => EntryPolicy::NextBarOpen,
        Some("reference_close") => EntryPolicy::ReferenceClose,
        Some(other) => {
            return Err(ArascanError::invalid(
                "backtest",
                "entry",
                format!("unknown entry '{other}', expected next_open or reference_close"),
            ))
        }
    };
    let window = match read_text(config, "backtest", "window").map(|s| s.to_lowercase()).as_deref() {
        None | Some("calendar") => WindowPolicy::CalendarDays,
        Some("bars") => WindowPolicy::TradingBars,
        Some(other) => {
            return Err(ArascanError::invalid(
                "backtest",
                "window",
                format!("unknown window '{other}', expected calendar or bars"),
            ))
        }
    };

    Ok(BacktestConfig {
        horizon_days: read_count(config, "backtest", "horizon_days")?
            .map_or(defaults.horizon_days, |n| n as u32),
        success_threshold_pct: read_float(config, "backtest", "success_threshold")?
            .unwrap_or(defaults.success_threshold_pct),
        epsilon_pct: read_float(config, "backtest", "epsilon")?.unwrap_or(defaults.epsilon_pct),
        entry,
        window,
        bands: AraBands::default(),
    })
}

pub fn parse_date(raw: &str, section: &str, key: &str) -> Result<NaiveDate, ArascanError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ArascanError::invalid(section, key, format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn read_text(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_float(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, ArascanError> {
    read_text(config, section, key)
        .map(|raw| match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ArascanError::invalid(section, key, format!("not a number: {raw}"))),
        })
        .transpose()
}

fn read_count(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<usize>, ArascanError> {
    read_text(config, section, key)
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| ArascanError::invalid(section, key, format!("not a non-negative integer: {raw}")))
        })
        .transpose()
}
