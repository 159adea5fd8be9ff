//! Symbol universe parsing and per-symbol skip bookkeeping.

use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Parse a comma separated code list, uppercasing each code and appending
/// `suffix` (e.g. `.JK`) when it is not already present.
pub fn parse_codes(input: &str, suffix: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = with_suffix(&trimmed.to_uppercase(), suffix);
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

pub fn with_suffix(code: &str, suffix: &str) -> String {
    let suffix = suffix.trim().to_uppercase();
    if suffix.is_empty() || code.ends_with(&suffix) {
        code.to_string()
    } else {
        format!("{code}{suffix}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientHistory { bars: usize, minimum: usize },
    Cancelled,
}

/// Per-batch counts reported next to every result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub processed: usize,
    pub skipped_insufficient_history: usize,
    pub skipped_no_data: usize,
    pub skipped_cancelled: usize,
    pub skipped: Vec<SkippedCode>,
}

impl Diagnostics {
    pub fn record_skip(&mut self, code: &str, reason: SkipReason) {
        match reason {
            SkipReason::NoData => self.skipped_no_data += 1,
            SkipReason::InsufficientHistory { .. } => self.skipped_insufficient_history += 1,
            SkipReason::Cancelled => self.skipped_cancelled += 1,
        }
        self.skipped.push(SkippedCode {
            code: code.to_string(),
            reason,
        });
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_basic() {
        let result = parse_codes("BBCA,TLKM,GOTO", "").unwrap();
        assert_eq!(result, vec!["BBCA", "TLKM", "GOTO"]);
    }

    #[test]
    fn test_parse_codes_with_whitespace_and_case() {
        let result = parse_codes("  bbca , Tlkm ,goto", "").unwrap();
        assert_eq!(result, vec!["BBCA", "TLKM", "GOTO"]);
    }

    #[test]
    fn test_parse_codes_appends_suffix() {
        let result = parse_codes("BBCA,TLKM.JK", ".jk").unwrap();
        assert_eq!(result, vec!["BBCA.JK", "TLKM.JK"]);
    }

    #[test]
    fn test_parse_codes_empty_token() {
        let result = parse_codes("BBCA,,TLKM", "");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_codes_duplicate_after_suffix() {
        let result = parse_codes("BBCA,BBCA.JK", ".JK");
        assert!(matches!(result, Err(UniverseError::DuplicateCode(s)) if s == "BBCA.JK"));
    }

    #[test]
    fn diagnostics_counts_by_reason() {
        let mut diag = Diagnostics::default();
        diag.record_skip("AAAA", SkipReason::NoData);
        diag.record_skip(
            "BBBB",
            SkipReason::InsufficientHistory {
                bars: 3,
                minimum: 21,
            },
        );
        diag.record_skip("CCCC", SkipReason::NoData);
        assert_eq!(diag.skipped_no_data, 2);
        assert_eq!(diag.skipped_insufficient_history, 1);
        assert_eq!(diag.total_skipped(), 3);
    }
}
