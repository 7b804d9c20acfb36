//! Database helpers for PostgreSQL, MySQL and SQLite
//!
//! This crate provides a thin convenience layer over `sqlx`: dialect
//! detection, timed statement execution with named parameters, schema
//! introspection, heuristic index advice, a fluent SELECT builder, DDL
//! generation, bulk inserts and sample data.
//!
//! ```no_run
//! use sqlh_core::params;
//! use sqlh_database::{QueryBuilder, connect};
//!
//! # async fn run() -> sqlh_core::Result<()> {
//! let db = connect("sqlite://app.db").await?;
//! let query = QueryBuilder::new("users")
//!     .select(["id", "username"])
//!     .and_where("age >= :min_age")
//!     .build(params! { "min_age" => 18 })?;
//! let result = db.execute_query(&query).await?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod advisor;
pub mod backend;
pub mod config;
pub mod ddl;
pub mod dialect;
pub mod helper;
mod introspect;
pub mod params;
pub mod query_builder;
pub mod sample;
pub mod testing;
pub mod types;

// Re-exports
pub use advisor::{Benefit, IndexRecommendation, RecommendationKind, recommend_indexes};
pub use backend::{Backend, MySqlBackend, PostgresBackend, SqliteBackend};
pub use config::EngineOptions;
pub use ddl::{ColumnSpec, TableDefinition, create_index_statement};
pub use dialect::{Dialect, DialectTemplates, PlaceholderStyle};
pub use helper::DatabaseHelper;
pub use params::Statement;
pub use query_builder::{BuiltQuery, JoinType, QueryBuilder};
pub use sample::SampleDataGenerator;
pub use types::{ColumnInfo, IndexInfo, QueryResult, TableInfo};

/// Create a [`DatabaseHelper`] for `connection_string` with default options
pub async fn connect(connection_string: &str) -> sqlh_core::Result<DatabaseHelper> {
    DatabaseHelper::connect(connection_string).await
}
