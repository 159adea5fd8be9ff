//! Universe list from a listing export.
//!
//! The file is a CSV with a header row; codes are read from the named column
//! (the exchange listing export calls it `Kode Saham`). Blank cells are
//! skipped and repeated codes keep their first position. When the export
//! also has a company name column (`Nama Perusahaan`), names are kept for
//! display.

use crate::domain::error::ArascanError;
use crate::domain::universe::with_suffix;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub codes: Vec<String>,
    /// Company name by suffixed code; empty when the column is absent.
    pub names: HashMap<String, String>,
}

pub fn load_listing<P: AsRef<Path>>(
    path: P,
    column: &str,
    name_column: &str,
    suffix: &str,
) -> Result<Listing, ArascanError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let listing = parse_listing(&content, column, name_column, suffix).map_err(|reason| {
        ArascanError::ConfigParse {
            file: path.display().to_string(),
            reason,
        }
    })?;
    info!(
        path = %path.display(),
        codes = listing.codes.len(),
        names = listing.names.len(),
        "universe loaded"
    );
    Ok(listing)
}

fn find_column(headers: &csv::StringRecord, column: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column.trim()))
}

pub fn parse_listing(
    content: &str,
    column: &str,
    name_column: &str,
    suffix: &str,
) -> Result<Listing, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = rdr.headers().map_err(|e| e.to_string())?.clone();
    let idx = find_column(&headers, column).ok_or_else(|| format!("column '{column}' not found"))?;
    let name_idx = find_column(&headers, name_column);

    let mut seen = HashSet::new();
    let mut listing = Listing::default();
    for result in rdr.records() {
        let record = result.map_err(|e| e.to_string())?;
        let raw = record.get(idx).map(str::trim).unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        let code = with_suffix(&raw.to_uppercase(), suffix);
        if !seen.insert(code.clone()) {
            continue;
        }
        let name = name_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(name) = name {
            listing.names.insert(code.clone(), name.to_string());
        }
        listing.codes.push(code);
    }

    if listing.codes.is_empty() {
        return Err(format!("no codes in column '{column}'"));
    }
    Ok(listing)
}
