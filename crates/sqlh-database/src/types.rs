//! Shared types for database helpers

use serde::{Deserialize, Serialize};
use sqlh_core::{Row, SqlValue};
use std::fmt;

/// Information about a table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type name as rendered by the engine's catalog
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

/// Information about a table index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    /// Key parts in index order; expression parts are [`IndexInfo::EXPRESSION`]
    pub columns: Vec<String>,
    pub is_unique: bool,
}

impl IndexInfo {
    /// Stand-in for a key part that is an expression rather than a column
    pub const EXPRESSION: &'static str = "<expression>";
}

/// Schema information for a table, rebuilt on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    /// `None` when the count query failed
    pub row_count: Option<i64>,
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table({}.{}, {} columns)",
            self.schema,
            self.name,
            self.columns.len()
        )
    }
}

/// Rows and timing for one executed statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Seconds from connection checkout to release, unrounded
    pub execution_time: f64,
    pub row_count: usize,
    pub column_names: Vec<String>,
}

impl QueryResult {
    pub(crate) fn new(rows: Vec<Row>, execution_time: f64) -> Self {
        let column_names = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            row_count: rows.len(),
            rows,
            execution_time,
            column_names,
        }
    }

    /// Value of `column` in the first row
    pub fn scalar(&self, column: &str) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.get(column))
    }

    /// Rows as JSON objects, keeping column order
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(row_to_json).collect())
    }
}

/// A row as a JSON object in column order
pub(crate) fn row_to_json(row: &Row) -> serde_json::Value {
    serde_json::Value::Object(
        row.iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueryResult(rows={}, time={:.3}s)",
            self.row_count, self.execution_time
        )
    }
}
