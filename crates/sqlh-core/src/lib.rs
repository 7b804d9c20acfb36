//! Core types for sqlh
//!
//! Error taxonomy, configuration loading and the value model shared by the
//! database helpers.

pub mod config;
pub mod error;
pub mod value;

// Re-exports
pub use config::{DatabaseConfig, ObservabilityConfig, SqlhConfig};
pub use error::{Error, Result};
pub use value::{Params, Record, Row, SqlValue, ValueKind};
