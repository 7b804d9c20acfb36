//! MySQL backend

use super::{Backend, bind_args, bytes_to_text, decode_error, finish};
use crate::config::EngineOptions;
use crate::dialect::Dialect;
use crate::params::Statement;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlh_core::{Error, Result, Row, SqlValue};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;

/// Pooled MySQL engine handle
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Create a lazily-connecting pool; no I/O happens until first use
    pub fn connect_lazy(connection_string: &str, options: &EngineOptions) -> Result<Self> {
        let connect_options = MySqlConnectOptions::from_str(connection_string).map_err(|e| {
            Error::config_error(format!("Invalid MySQL connection string: {}", e))
        })?;

        let pool = MySqlPoolOptions::new()
            .max_connections(options.max_connections())
            .acquire_timeout(options.acquire_timeout())
            .connect_lazy_with(connect_options);

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), decode_value(row, i, column.name())?);
    }
    Ok(out)
}

fn decode_value(row: &MySqlRow, i: usize, column: &str) -> Result<SqlValue> {
    let raw = row.try_get_raw(i).map_err(|_| decode_error(column, "unknown"))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(i).map(SqlValue::Boolean),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get::<i64, _>(i).map(SqlValue::Integer)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let unsigned = row
                .try_get::<u64, _>(i)
                .map_err(|_| decode_error(column, &type_name))?;
            return i64::try_from(unsigned)
                .map(SqlValue::Integer)
                .map_err(|_| decode_error(column, &type_name));
        }
        "FLOAT" => row.try_get::<f32, _>(i).map(|v| SqlValue::Float(v.into())),
        "DOUBLE" => row.try_get::<f64, _>(i).map(SqlValue::Float),
        // Exact numerics travel as text; keep them that way rather than round
        "DECIMAL" => row.try_get_unchecked::<String, _>(i).map(SqlValue::Text),
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            row.try_get::<String, _>(i).map(SqlValue::Text)
        }
        "DATETIME" | "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(i).map(SqlValue::Timestamp),
        "DATE" => row
            .try_get::<NaiveDate, _>(i)
            .map(|v| SqlValue::Text(v.to_string())),
        "JSON" => row.try_get::<serde_json::Value, _>(i).map(SqlValue::Json),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            let bytes = row
                .try_get::<Vec<u8>, _>(i)
                .map_err(|_| decode_error(column, &type_name))?;
            return bytes_to_text(bytes, column, &type_name);
        }
        _ => return Err(decode_error(column, &type_name)),
    };

    value.map_err(|_| decode_error(column, &type_name))
}
