//! SQLite backend

use super::{Backend, bind_args, bytes_to_text, decode_error, finish};
use crate::config::EngineOptions;
use crate::dialect::Dialect;
use crate::params::Statement;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlh_core::{Error, Result, Row, SqlValue};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;

/// SQLite engine handle.
///
/// SQLite is not pooled: a single connection is kept open for the lifetime
/// of the handle and every operation checks it out in turn. This also keeps
/// `sqlite::memory:` databases alive between calls.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Create the handle; the database file is created on first use if missing
    pub fn connect_lazy(connection_string: &str, options: &EngineOptions) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|e| Error::config_error(format!("Invalid SQLite connection string: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(options.acquire_timeout())
            .connect_lazy_with(connect_options);

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>> {
        let mut tx = self.pool.begin().await.map_err(Error::Connection)?;

        let fetched = bind_args::<_, Option<String>>(sqlx::query(&statement.sql), statement)
            .fetch_all(&mut *tx)
            .await;
        let outcome: Result<Vec<Row>> = match fetched {
            Ok(rows) => rows.iter().map(decode_row).collect(),
            Err(e) => Err(Error::execution(&statement.sql, e)),
        };

        finish(tx, outcome).await
    }

    async fn execute_all(&self, statements: &[Statement]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Connection)?;

        let outcome: Result<u64> = async {
            let mut total = 0;
            for statement in statements {
                total += bind_args::<_, Option<String>>(
                    sqlx::query(&statement.sql),
                    statement,
                )
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::execution(&statement.sql, e))?
                .rows_affected();
            }
            Ok(total)
        }
        .await;

        finish(tx, outcome).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let declared = column.type_info().name().to_string();
        out.insert(
            column.name().to_string(),
            decode_value(row, i, column.name(), &declared)?,
        );
    }
    Ok(out)
}

/// Values carry their storage class (INTEGER, REAL, TEXT, BLOB); booleans and
/// timestamps are only recognisable from the column's declared type.
fn decode_value(row: &SqliteRow, i: usize, column: &str, declared: &str) -> Result<SqlValue> {
    let raw = row.try_get_raw(i).map_err(|_| decode_error(column, declared))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_string();

    match (declared, storage.as_str()) {
        ("BOOLEAN", "INTEGER" | "BOOLEAN") => {
            return row
                .try_get_unchecked::<bool, _>(i)
                .map(SqlValue::Boolean)
                .map_err(|_| decode_error(column, declared));
        }
        ("DATETIME", "TEXT" | "DATETIME") => {
            if let Ok(ts) = row.try_get_unchecked::<NaiveDateTime, _>(i) {
                return Ok(SqlValue::Timestamp(ts));
            }
        }
        _ => {}
    }

    let value = match storage.as_str() {
        "INTEGER" => row.try_get_unchecked::<i64, _>(i).map(SqlValue::Integer),
        "REAL" => row.try_get_unchecked::<f64, _>(i).map(SqlValue::Float),
        "TEXT" | "DATETIME" | "DATE" | "TIME" => {
            row.try_get_unchecked::<String, _>(i).map(SqlValue::Text)
        }
        "BLOB" => {
            let bytes = row
                .try_get_unchecked::<Vec<u8>, _>(i)
                .map_err(|_| decode_error(column, &storage))?;
            return bytes_to_text(bytes, column, &storage);
        }
        _ => return Err(decode_error(column, &storage)),
    };

    value.map_err(|_| decode_error(column, &storage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_backend() -> SqliteBackend {
        SqliteBackend::connect_lazy("sqlite::memory:", &EngineOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_decodes_declared_types() {
        let backend = memory_backend();
        backend
            .execute_all(&[Statement::positional(
                "CREATE TABLE t (n INTEGER, f FLOAT, s VARCHAR(255), b BOOLEAN, ts TIMESTAMP, z TEXT)",
                Vec::new(),
            )])
            .await
            .unwrap();

        let ts = chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        backend
            .execute_all(&[Statement::positional(
                "INSERT INTO t VALUES (?, ?, ?, ?, ?, ?)",
                vec![
                    SqlValue::Integer(42),
                    SqlValue::Float(1.5),
                    SqlValue::Text("hi".to_string()),
                    SqlValue::Boolean(true),
                    SqlValue::Timestamp(ts),
                    SqlValue::Null,
                ],
            )])
            .await
            .unwrap();

        let rows = backend
            .fetch_all(&Statement::positional("SELECT * FROM t", Vec::new()))
            .await
            .unwrap();
        let row = &rows[0];
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["n", "f", "s", "b", "ts", "z"]);
        assert_eq!(row["n"], SqlValue::Integer(42));
        assert_eq!(row["f"], SqlValue::Float(1.5));
        assert_eq!(row["s"], SqlValue::Text("hi".to_string()));
        assert_eq!(row["b"], SqlValue::Boolean(true));
        assert_eq!(row["ts"], SqlValue::Timestamp(ts));
        assert_eq!(row["z"], SqlValue::Null);
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back_whole_batch() {
        let backend = memory_backend();
        backend
            .execute_all(&[Statement::positional(
                "CREATE TABLE t (id INTEGER PRIMARY KEY)",
                Vec::new(),
            )])
            .await
            .unwrap();

        let result = backend
            .execute_all(&[
                Statement::positional("INSERT INTO t (id) VALUES (?)", vec![SqlValue::Integer(1)]),
                Statement::positional("INSERT INTO t (id) VALUES (?)", vec![SqlValue::Integer(1)]),
            ])
            .await;
        assert!(matches!(result, Err(Error::Execution { .. })));

        let rows = backend
            .fetch_all(&Statement::positional("SELECT COUNT(*) AS count FROM t", Vec::new()))
            .await
            .unwrap();
        assert_eq!(rows[0]["count"], SqlValue::Integer(0));
    }

    #[tokio::test]
    async fn test_connection_is_released_after_error() {
        let backend = memory_backend();
        for _ in 0..3 {
            let result = backend
                .fetch_all(&Statement::positional("SELECT * FROM missing", Vec::new()))
                .await;
            assert!(matches!(result, Err(Error::Execution { .. })));
        }
        // A leaked checkout would time out here with a single-connection pool
        let rows = backend
            .fetch_all(&Statement::positional("SELECT 1 AS one", Vec::new()))
            .await
            .unwrap();
        assert_eq!(rows[0]["one"], SqlValue::Integer(1));
    }
}
