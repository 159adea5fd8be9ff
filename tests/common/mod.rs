#![allow(dead_code)]

use arascan::domain::error::ArascanError;
pub use arascan::domain::ohlcv::OhlcvBar;
use arascan::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ArascanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(ArascanError::Provider {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ArascanError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ArascanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(ArascanError::Provider {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `n` (1-based) counted from 2024-01-01.
pub fn day(n: i64) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(n - 1)
}

pub fn make_bar(code: &str, n: i64, open: f64, close: f64, volume: i64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date: day(n),
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume,
    }
}

/// `count` daily bars from day 1 at a constant price.
pub fn flat_bars(code: &str, count: usize, price: f64, volume: i64) -> Vec<OhlcvBar> {
    (1..=count as i64)
        .map(|n| make_bar(code, n, price, price, volume))
        .collect()
}

/// `count` daily bars from day 1 rising by `step` per bar.
pub fn rising_bars(code: &str, count: usize, start_price: f64, step: f64, volume: i64) -> Vec<OhlcvBar> {
    (1..=count as i64)
        .map(|n| {
            let close = start_price + step * (n - 1) as f64;
            let open = close - step;
            OhlcvBar {
                code: code.to_string(),
                date: day(n),
                open,
                high: close + step / 2.0,
                low: open - step / 2.0,
                close,
                volume,
            }
        })
        .collect()
}

/// 60 flat bars at 100, then a bar opening at 100 and closing at 135, then
/// flat at 135.
pub fn limit_up_bars(code: &str) -> Vec<OhlcvBar> {
    let mut bars = flat_bars(code, 60, 100.0, 10_000);
    bars.push(make_bar(code, 61, 100.0, 135.0, 80_000));
    bars.extend((62..=75).map(|n| make_bar(code, n, 135.0, 135.0, 10_000)));
    bars
}
