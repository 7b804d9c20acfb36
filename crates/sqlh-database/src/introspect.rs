//! Catalog queries for schema introspection
//!
//! Every dialect's column and index queries return the same aliases, so one
//! parser handles them all:
//! - columns: `name, data_type, nullable, default_value, is_primary_key`
//! - indexes: `index_name, column_name, is_unique`, one row per indexed column
//!   in index order
//!
//! Primary-key indexes are left out of the index list. Expression key parts
//! come back as [`IndexInfo::EXPRESSION`] so an index keeps its arity.

use crate::dialect::Dialect;
use crate::types::{ColumnInfo, IndexInfo};
use sqlh_core::{Error, Params, Result, Row, SqlValue};

/// Named-parameter SQL for a catalog lookup
#[derive(Debug, Clone)]
pub(crate) struct CatalogQuery {
    pub sql: String,
    pub params: Params,
}

impl CatalogQuery {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    fn param(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

pub(crate) fn list_tables_query(dialect: Dialect, schema: Option<&str>) -> CatalogQuery {
    match dialect {
        Dialect::Postgres => CatalogQuery::new(
            "SELECT table_name::text AS name
             FROM information_schema.tables
             WHERE table_schema = :schema AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .param("schema", schema.unwrap_or("public")),
        Dialect::MySql => CatalogQuery::new(
            "SELECT CAST(TABLE_NAME AS CHAR) AS name
             FROM information_schema.TABLES
             WHERE TABLE_SCHEMA = COALESCE(:schema, DATABASE()) AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME",
        )
        .param("schema", schema),
        Dialect::Sqlite => CatalogQuery::new(format!(
            "SELECT name
             FROM {}sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
            schema.map(|s| format!("{}.", s)).unwrap_or_default()
        )),
    }
}

pub(crate) fn columns_query(dialect: Dialect, table: &str, schema: Option<&str>) -> CatalogQuery {
    match dialect {
        Dialect::Postgres => CatalogQuery::new(
            "SELECT c.column_name::text AS name,
                    c.data_type::text AS data_type,
                    (c.is_nullable = 'YES') AS nullable,
                    c.column_default::text AS default_value,
                    EXISTS (
                        SELECT 1
                        FROM information_schema.table_constraints tc
                        JOIN information_schema.key_column_usage kcu
                          ON kcu.constraint_name = tc.constraint_name
                         AND kcu.table_schema = tc.table_schema
                         AND kcu.table_name = tc.table_name
                        WHERE tc.constraint_type = 'PRIMARY KEY'
                          AND tc.table_schema = c.table_schema
                          AND tc.table_name = c.table_name
                          AND kcu.column_name = c.column_name
                    ) AS is_primary_key
             FROM information_schema.columns c
             WHERE c.table_schema = :schema AND c.table_name = :table
             ORDER BY c.ordinal_position",
        )
        .param("schema", schema.unwrap_or("public"))
        .param("table", table),
        Dialect::MySql => CatalogQuery::new(
            "SELECT CAST(COLUMN_NAME AS CHAR) AS name,
                    CAST(COLUMN_TYPE AS CHAR) AS data_type,
                    (IS_NULLABLE = 'YES') AS nullable,
                    CAST(COLUMN_DEFAULT AS CHAR) AS default_value,
                    (COLUMN_KEY = 'PRI') AS is_primary_key
             FROM information_schema.COLUMNS
             WHERE TABLE_SCHEMA = COALESCE(:schema, DATABASE()) AND TABLE_NAME = :table
             ORDER BY ORDINAL_POSITION",
        )
        .param("schema", schema)
        .param("table", table),
        Dialect::Sqlite => CatalogQuery::new(format!(
            "SELECT name,
                    type AS data_type,
                    (\"notnull\" = 0) AS nullable,
                    dflt_value AS default_value,
                    (pk > 0) AS is_primary_key
             FROM pragma_table_info(:table{})
             ORDER BY cid",
            if schema.is_some() { ", :schema" } else { "" }
        ))
        .param("table", table)
        .param("schema", schema),
    }
}

pub(crate) fn indexes_query(dialect: Dialect, table: &str, schema: Option<&str>) -> CatalogQuery {
    match dialect {
        // attnum 0 marks an expression part; it has no pg_attribute row
        Dialect::Postgres => CatalogQuery::new(format!(
            "SELECT i.relname::text AS index_name,
                    COALESCE(a.attname::text, '{expression}') AS column_name,
                    ix.indisunique AS is_unique
             FROM pg_class t
             JOIN pg_namespace n ON n.oid = t.relnamespace
             JOIN pg_index ix ON ix.indrelid = t.oid
             JOIN pg_class i ON i.oid = ix.indexrelid
             JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
             LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
             WHERE n.nspname = :schema AND t.relname = :table AND NOT ix.indisprimary
               AND k.ord <= ix.indnkeyatts
             ORDER BY i.relname, k.ord",
            expression = IndexInfo::EXPRESSION
        ))
        .param("schema", schema.unwrap_or("public"))
        .param("table", table),
        // Functional key parts have a NULL COLUMN_NAME
        Dialect::MySql => CatalogQuery::new(format!(
            "SELECT CAST(INDEX_NAME AS CHAR) AS index_name,
                    COALESCE(CAST(COLUMN_NAME AS CHAR), '{expression}') AS column_name,
                    (NON_UNIQUE = 0) AS is_unique
             FROM information_schema.STATISTICS
             WHERE TABLE_SCHEMA = COALESCE(:schema, DATABASE())
               AND TABLE_NAME = :table
               AND INDEX_NAME <> 'PRIMARY'
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
            expression = IndexInfo::EXPRESSION
        ))
        .param("schema", schema)
        .param("table", table),
        Dialect::Sqlite => {
            let schema_arg = if schema.is_some() { ", :schema" } else { "" };
            CatalogQuery::new(format!(
                "SELECT il.name AS index_name,
                        COALESCE(ii.name, '{expression}') AS column_name,
                        il.\"unique\" AS is_unique
                 FROM pragma_index_list(:table{schema_arg}) AS il
                 JOIN pragma_index_info(il.name{schema_arg}) AS ii
                 WHERE il.origin <> 'pk'
                 ORDER BY il.name, ii.seqno",
                expression = IndexInfo::EXPRESSION
            ))
            .param("table", table)
            .param("schema", schema)
        }
    }
}

/// MySQL has no fixed default namespace; ask which database is selected
pub(crate) fn current_database_query() -> CatalogQuery {
    CatalogQuery::new("SELECT CAST(DATABASE() AS CHAR) AS name")
}

pub(crate) fn row_count_query(table: &str, schema: Option<&str>) -> CatalogQuery {
    let qualified = match schema {
        Some(schema) => format!("{}.{}", schema, table),
        None => table.to_string(),
    };
    CatalogQuery::new(format!("SELECT COUNT(*) AS count FROM {}", qualified))
}

pub(crate) fn parse_names(rows: &[Row]) -> Result<Vec<String>> {
    rows.iter().map(|row| required_text(row, "name")).collect()
}

pub(crate) fn parse_columns(rows: &[Row]) -> Result<Vec<ColumnInfo>> {
    rows.iter()
        .map(|row| {
            Ok(ColumnInfo {
                name: required_text(row, "name")?,
                data_type: optional_text(row, "data_type").unwrap_or_default(),
                nullable: flag(row, "nullable")?,
                default_value: optional_text(row, "default_value"),
                is_primary_key: flag(row, "is_primary_key")?,
            })
        })
        .collect()
}

/// Group per-column rows into indexes, keeping first-seen index order
pub(crate) fn parse_indexes(rows: &[Row]) -> Result<Vec<IndexInfo>> {
    let mut indexes: Vec<IndexInfo> = Vec::new();
    for row in rows {
        let name = required_text(row, "index_name")?;
        let column = optional_text(row, "column_name")
            .unwrap_or_else(|| IndexInfo::EXPRESSION.to_string());

        match indexes.iter_mut().find(|idx| idx.name == name) {
            Some(index) => index.columns.push(column),
            None => indexes.push(IndexInfo {
                name,
                columns: vec![column],
                is_unique: flag(row, "is_unique")?,
            }),
        }
    }
    Ok(indexes)
}

fn required_text(row: &Row, column: &str) -> Result<String> {
    optional_text(row, column)
        .ok_or_else(|| Error::message(format!("Catalog row has no value for '{}'", column)))
}

fn optional_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        SqlValue::Null => None,
        SqlValue::Text(v) => Some(v.clone()),
        other => Some(other.to_string()),
    }
}

fn flag(row: &Row, column: &str) -> Result<bool> {
    row.get(column)
        .and_then(SqlValue::as_bool)
        .ok_or_else(|| Error::message(format!("Catalog row has no boolean for '{}'", column)))
}
