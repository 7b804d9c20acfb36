//! PostgreSQL backend

use super::{Backend, bind_args, decode_error, finish};
use crate::config::EngineOptions;
use crate::dialect::Dialect;
use crate::params::Statement;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlh_core::{Error, Result, Row, SqlValue};
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgTypeInfo,
    Postgres,
};
use sqlx::query::Query;
use sqlx::types::BigDecimal;
use sqlx::{Column, Row as _, Type, TypeInfo, ValueRef};
use std::str::FromStr;

/// Pooled PostgreSQL engine handle
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Create a lazily-connecting pool; no I/O happens until first use
    pub fn connect_lazy(connection_string: &str, options: &EngineOptions) -> Result<Self> {
        let connect_options = PgConnectOptions::from_str(connection_string).map_err(|e| {
            Error::config_error(format!("Invalid PostgreSQL connection string: {}", e))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections())
            .acquire_timeout(options.acquire_timeout())
            .connect_lazy_with(connect_options);

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>> {
        let mut tx = self.pool.begin().await.map_err(Error::Connection)?;

        let fetched = pg_query(statement).fetch_all(&mut *tx).await;
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
                total += pg_query(statement)
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

/// NULL sent with an unspecified parameter type; the server infers it from
/// where the placeholder appears
#[derive(Debug, Default, Clone, Copy)]
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(
        &self,
        _buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Bound query for `statement`.
///
/// Statements carrying an untyped NULL are not cached: their prepared
/// parameter types depend on inference and must not be reused for a later
/// call that binds concrete values.
fn pg_query(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
    bind_args::<_, UntypedNull>(sqlx::query(&statement.sql), statement)
        .persistent(!statement.has_untyped_null())
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), decode_value(row, i, column.name())?);
    }
    Ok(out)
}

fn decode_value(row: &PgRow, i: usize, column: &str) -> Result<SqlValue> {
    let raw = row.try_get_raw(i).map_err(|_| decode_error(column, "unknown"))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(i).map(SqlValue::Boolean),
        "INT2" => row.try_get::<i16, _>(i).map(|v| SqlValue::Integer(v.into())),
        "INT4" => row.try_get::<i32, _>(i).map(|v| SqlValue::Integer(v.into())),
        "INT8" => row.try_get::<i64, _>(i).map(SqlValue::Integer),
        "OID" => row
            .try_get::<Oid, _>(i)
            .map(|v| SqlValue::Integer(i64::from(v.0))),
        "FLOAT4" => row.try_get::<f32, _>(i).map(|v| SqlValue::Float(v.into())),
        "FLOAT8" => row.try_get::<f64, _>(i).map(SqlValue::Float),
        // Exact numerics (AVG, SUM over bigint) stay exact as text
        "NUMERIC" => row
            .try_get::<BigDecimal, _>(i)
            .map(|v| SqlValue::Text(v.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            row.try_get::<String, _>(i).map(SqlValue::Text)
        }
        "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(i).map(SqlValue::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(i)
            .map(|v| SqlValue::Timestamp(v.naive_utc())),
        "DATE" => row
            .try_get::<NaiveDate, _>(i)
            .map(|v| SqlValue::Text(v.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(i)
            .map(|v| SqlValue::Text(v.to_string())),
        "INTERVAL" => row
            .try_get::<PgInterval, _>(i)
            .map(|v| SqlValue::Text(format_interval(&v))),
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(i)
            .map(|v| SqlValue::Text(format_bytea(&v))),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(i)
            .map(|v| SqlValue::Text(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(i).map(SqlValue::Json),
        _ => return Err(decode_error(column, &type_name)),
    };

    value.map_err(|_| decode_error(column, &type_name))
}

/// Render an interval the way PostgreSQL's default output style does,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`
fn format_interval(interval: &PgInterval) -> String {
    fn unit(n: i32, name: &str) -> String {
        if n == 1 {
            format!("{} {}", n, name)
        } else {
            format!("{} {}s", n, name)
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "mon"));
    }
    if interval.days != 0 {
        parts.push(unit(interval.days, "day"));
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if micros != 0 {
            let fraction = format!("{:06}", micros);
            clock.push('.');
            clock.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// Binary data in PostgreSQL's hex output format
fn format_bytea(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
