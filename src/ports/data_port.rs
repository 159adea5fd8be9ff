//! Market data access port.
//!
//! The benchmark index is served through the same port under its own symbol.

use crate::domain::error::ArascanError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code` with `start_date <= date <= end_date`. An unknown code
    /// yields an empty vector rather than an error.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ArascanError>;

    fn list_symbols(&self) -> Result<Vec<String>, ArascanError>;

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ArascanError>;
}
