//! Static reference data port (free float and similar attributes).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceData {
    pub free_float_pct: Option<f64>,
}

pub trait ReferenceDataPort: Sync {
    fn get(&self, code: &str) -> Option<ReferenceData>;
}

/// Reference provider with no data; every lookup misses.
pub struct NoReferenceData;

impl ReferenceDataPort for NoReferenceData {
    fn get(&self, _code: &str) -> Option<ReferenceData> {
        None
    }
}
