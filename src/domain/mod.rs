//! Core domain types and logic.

pub mod ohlcv;
pub mod series_store;
pub mod indicator;
pub mod snapshot;
pub mod rule;
pub mod rule_eval;
pub mod ranking;
pub mod screening;
pub mod forward;
pub mod report;
pub mod universe;
pub mod config_validation;
pub mod error;
