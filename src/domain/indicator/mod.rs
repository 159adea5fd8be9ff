//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every calculator takes a bar slice that ends at the reference date and
//! emits one point per input bar, flagging warmup points as invalid.

pub mod ema;
pub mod macd;
pub mod mfi;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use mfi::calculate_mfi;
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_volume_sma};

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

impl IndicatorValue {
    pub fn as_simple(&self) -> Option<f64> {
        match self {
            IndicatorValue::Simple(v) => Some(*v),
            IndicatorValue::Macd { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    VolumeSma(usize),
    Ema(usize),
    Rsi(usize),
    Mfi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The last point, if it is past warmup.
    pub fn latest(&self) -> Option<IndicatorValue> {
        self.values
            .last()
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    /// The last point as a scalar, if valid and finite.
    pub fn latest_simple(&self) -> Option<f64> {
        self.latest()
            .and_then(|v| v.as_simple())
            .filter(|v| v.is_finite())
    }

    pub(crate) fn invalid(indicator_type: IndicatorType, dates: impl Iterator<Item = NaiveDate>) -> Self {
        let values = dates
            .map(|date| IndicatorPoint {
                date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();
        Self {
            indicator_type,
            values,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}
