//! CREATE TABLE / CREATE INDEX generation

use crate::dialect::Dialect;
use serde::{Deserialize, Serialize};
use sqlh_core::{Error, Record, Result, SqlValue, ValueKind};

/// One declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ValueKind,
    pub nullable: bool,
}

impl ColumnSpec {
    /// A NOT NULL column
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn render(&self, primary_key: &str) -> String {
        if self.name == primary_key {
            format!("{} {} PRIMARY KEY", self.name, self.kind.sql_type())
        } else {
            let null = if self.nullable { "NULL" } else { "NOT NULL" };
            format!("{} {} {}", self.name, self.kind.sql_type(), null)
        }
    }
}

/// Declared shape of a table to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableDefinition {
    /// A table with primary key `id` and no other columns yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            columns: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Infer column kinds from a sample record.
    ///
    /// Every sampled column is NOT NULL. A NULL or JSON sample has no kind to
    /// infer from and is rejected.
    pub fn from_record(
        name: impl Into<String>,
        record: &Record,
        primary_key: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let columns = record
            .iter()
            .map(|(column, value)| {
                value
                    .kind()
                    .map(|kind| ColumnSpec::new(column.clone(), kind))
                    .ok_or_else(|| {
                        let what = match value {
                            SqlValue::Null => "NULL",
                            _ => "a JSON document",
                        };
                        Error::validation(format!(
                            "Cannot infer a type for '{}.{}' from {}; declare the column instead",
                            name, column, what
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            primary_key: primary_key.into(),
            columns,
        })
    }

    /// Render CREATE TABLE for `dialect`.
    ///
    /// When the primary key is not one of the declared columns, the
    /// dialect's auto-increment key column is added first.
    pub fn render(&self, dialect: Dialect) -> String {
        let mut lines = Vec::with_capacity(self.columns.len() + 1);
        if !self.columns.iter().any(|c| c.name == self.primary_key) {
            lines.push(dialect.auto_increment_primary_key(&self.primary_key));
        }
        lines.extend(self.columns.iter().map(|c| c.render(&self.primary_key)));

        format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.name,
            lines.join(",\n    ")
        )
    }
}

/// `CREATE INDEX idx_<table>_<column> ON <table>(<column>);`
pub fn create_index_statement(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX idx_{table}_{column} ON {table}({column});",
        table = table,
        column = column
    )
}
