//! CSV file data adapters.
//!
//! Quotes live in one `<SYMBOL>.csv` per symbol with the header
//! `date,open,high,low,close,volume`. Reference attributes live in a single
//! `code,free_float_pct` file.

use crate::domain::error::ArascanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use crate::ports::reference_port::{ReferenceData, ReferenceDataPort};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    /// Every parsable row of the symbol's file, unsorted. A missing file
    /// yields no rows.
    fn read_rows(&self, code: &str) -> Result<Vec<OhlcvBar>, ArascanError> {
        let path = self.csv_path(code);
        if !path.exists() {
            debug!(code, path = %path.display(), "no quote file");
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| ArascanError::Provider {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ArascanError::Provider {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

            let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d").map_err(|e| {
                ArascanError::Provider {
                    reason: format!("invalid date '{}' in {}: {}", field(0), path.display(), e),
                }
            })?;

            // rows without a close are not quotes
            let Some(close) = parse_price(field(4), "close", &path)? else {
                continue;
            };
            let open = parse_price(field(1), "open", &path)?.unwrap_or(close);
            let high = parse_price(field(2), "high", &path)?.unwrap_or(close);
            let low = parse_price(field(3), "low", &path)?.unwrap_or(close);
            let volume = parse_volume(field(5), &path)?;

            bars.push(OhlcvBar {
                code: code.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(bars)
    }
}

fn parse_price(raw: &str, column: &str, path: &Path) -> Result<Option<f64>, ArascanError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| ArascanError::Provider {
            reason: format!("invalid {} value '{}' in {}: {}", column, raw, path.display(), e),
        })
}

fn parse_volume(raw: &str, path: &Path) -> Result<i64, ArascanError> {
    if raw.is_empty() {
        return Ok(0);
    }
    // some exports write volume as a float
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.round() as i64))
        .map_err(|e| ArascanError::Provider {
            reason: format!("invalid volume value '{}' in {}: {}", raw, path.display(), e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ArascanError> {
        let mut bars: Vec<OhlcvBar> = self
            .read_rows(code)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect();
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ArascanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ArascanError::Provider {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| ArascanError::Provider {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ArascanError> {
        let rows = self.read_rows(code)?;
        let first = rows.iter().map(|b| b.date).min();
        let last = rows.iter().map(|b| b.date).max();
        Ok(first.zip(last).map(|(first, last)| (first, last, rows.len())))
    }
}

/// Free float and similar attributes from `code,free_float_pct`.
pub struct CsvReferenceAdapter {
    entries: HashMap<String, ReferenceData>,
}

impl CsvReferenceAdapter {
    /// Codes get `suffix` appended so they match the quote symbols.
    pub fn from_file<P: AsRef<Path>>(path: P, suffix: &str) -> Result<Self, ArascanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_string(&content, suffix).map_err(|reason| ArascanError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str, suffix: &str) -> Result<Self, String> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut entries = HashMap::new();

        for result in rdr.records() {
            let record = result.map_err(|e| e.to_string())?;
            let code = record.get(0).map(str::trim).unwrap_or("");
            if code.is_empty() {
                continue;
            }
            let raw = record.get(1).map(str::trim).unwrap_or("");
            let free_float_pct = if raw.is_empty() {
                None
            } else {
                Some(
                    raw.trim_end_matches('%')
                        .parse::<f64>()
                        .map_err(|_| format!("invalid free_float_pct '{raw}' for {code}"))?,
                )
            };
            let code = crate::domain::universe::with_suffix(&code.to_uppercase(), suffix);
            entries.insert(code, ReferenceData { free_float_pct });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceDataPort for CsvReferenceAdapter {
    fn get(&self, code: &str) -> Option<ReferenceData> {
        self.entries.get(code).copied()
    }
}
