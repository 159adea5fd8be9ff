//! Per-symbol OHLCV history, ascending by date and immutable for a run.
//!
//! Readers never see the whole series: [`SeriesStore::history`] returns bars
//! up to and including a reference date and [`SeriesStore::forward`] returns
//! bars strictly after it.

use crate::domain::error::ArascanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::{SkipReason, SkippedCode};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    series: BTreeMap<String, Vec<OhlcvBar>>,
}

pub struct LoadedStore {
    pub store: SeriesStore,
    pub skipped: Vec<SkippedCode>,
}

impl SeriesStore {
    /// Build from already fetched rows. Rows are cleaned the same way as in
    /// [`SeriesStore::load`]; symbols left with no rows are dropped.
    pub fn from_series(series: BTreeMap<String, Vec<OhlcvBar>>) -> Self {
        let series = series
            .into_iter()
            .map(|(code, bars)| {
                let cleaned = normalize(bars);
                (code, cleaned)
            })
            .filter(|(_, bars)| !bars.is_empty())
            .collect();
        Self { series }
    }

    /// Fetch every symbol through `data_port`. Symbols that fail or come back
    /// empty are recorded as skipped; the call fails only when no symbol
    /// produced any rows.
    pub fn load(
        data_port: &dyn DataPort,
        codes: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<LoadedStore, ArascanError> {
        let mut series = BTreeMap::new();
        let mut skipped = Vec::new();

        for code in codes {
            let bars = match data_port.fetch_ohlcv(code, start_date, end_date) {
                Ok(bars) => normalize(bars),
                Err(e) => {
                    warn!(code = %code, error = %e, "skipping symbol");
                    skipped.push(SkippedCode {
                        code: code.clone(),
                        reason: SkipReason::NoData,
                    });
                    continue;
                }
            };

            if bars.is_empty() {
                warn!(code = %code, "skipping symbol (no data found)");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }

            debug!(code = %code, bars = bars.len(), "loaded");
            series.insert(code.clone(), bars);
        }

        if series.is_empty() {
            return Err(ArascanError::DataUnavailable {
                scope: format!("{} symbols from {} to {}", codes.len(), start_date, end_date),
            });
        }

        info!(
            loaded = series.len(),
            skipped = skipped.len(),
            "series store ready"
        );

        Ok(LoadedStore {
            store: Self { series },
            skipped,
        })
    }

    /// Symbols in lexicographic order.
    pub fn symbols(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.series.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn bar_count(&self, code: &str) -> usize {
        self.series.get(code).map_or(0, Vec::len)
    }

    pub fn all_bars(&self, code: &str) -> &[OhlcvBar] {
        self.series.get(code).map_or(&[], Vec::as_slice)
    }

    /// Bars with `date <= reference_date`.
    pub fn history(&self, code: &str, reference_date: NaiveDate) -> &[OhlcvBar] {
        let bars = self.all_bars(code);
        let end = bars.partition_point(|b| b.date <= reference_date);
        &bars[..end]
    }

    /// Bars with `date > reference_date`.
    pub fn forward(&self, code: &str, reference_date: NaiveDate) -> &[OhlcvBar] {
        let bars = self.all_bars(code);
        let start = bars.partition_point(|b| b.date <= reference_date);
        &bars[start..]
    }
}

/// Drop malformed rows, sort ascending, keep the last row for a repeated date.
fn normalize(mut bars: Vec<OhlcvBar>) -> Vec<OhlcvBar> {
    bars.retain(OhlcvBar::is_well_formed);
    // stable sort keeps source order within a date, so the last row wins below
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}
