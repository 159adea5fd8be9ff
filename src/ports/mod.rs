//! Port traits for external collaborators.

pub mod config_port;
pub mod data_port;
pub mod reference_port;
