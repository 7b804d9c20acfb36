//! # sqlh
//!
//! Convenience helpers for PostgreSQL, MySQL and SQLite databases.
//!
//! This crate re-exports the workspace members:
//! - [`sqlh_core`]: errors, configuration and the value model
//! - [`sqlh_telemetry`]: logging and statement tracing
//! - [`sqlh_database`]: connections, execution, introspection, index advice,
//!   query building, DDL, bulk inserts and sample data

pub use sqlh_core;
pub use sqlh_database;
pub use sqlh_telemetry;

pub use sqlh_core::{Error, Params, Record, Result, Row, SqlValue, params, record};
pub use sqlh_database::{DatabaseHelper, QueryBuilder, connect};
