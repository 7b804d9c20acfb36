//! Engine backends
//!
//! A [`Backend`] is the only way the helpers reach a database: it runs
//! positional statements inside a scoped transaction and hands rows back as
//! ordered maps. Each call checks out a connection, begins a transaction,
//! commits on success, rolls back on any failure and returns the connection
//! to the pool when the transaction handle drops.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use crate::dialect::Dialect;
use crate::params::Statement;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlh_core::{Error, Result, Row, SqlValue, ValueKind};
use sqlx::{Database, Encode, Transaction, Type, query::Query, types::Json};

pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

/// Capability to run statements against a configured database
#[async_trait]
pub trait Backend: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run one statement in its own transaction and return its rows
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Run statements in order inside one transaction.
    ///
    /// Returns the total number of affected rows. If any statement fails,
    /// none of them take effect.
    async fn execute_all(&self, statements: &[Statement]) -> Result<u64>;

    /// Close the pool; later calls fail to acquire a connection
    async fn close(&self);
}

/// Bind statement arguments in order.
///
/// A NULL whose kind is known binds as a typed `None`; otherwise it binds as
/// `N`, the dialect's stand-in for an untyped NULL.
pub(crate) fn bind_args<'q, DB, N>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    statement: &Statement,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    N: Default + Encode<'q, DB> + Type<DB> + Send + 'q,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    NaiveDateTime: Encode<'q, DB> + Type<DB>,
    Option<bool>: Encode<'q, DB> + Type<DB>,
    Option<i64>: Encode<'q, DB> + Type<DB>,
    Option<f64>: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
    Option<NaiveDateTime>: Encode<'q, DB> + Type<DB>,
    Json<serde_json::Value>: Encode<'q, DB> + Type<DB>,
{
    for (i, arg) in statement.args.iter().enumerate() {
        query = match arg {
            SqlValue::Null => match statement.null_kind(i) {
                Some(ValueKind::Boolean) => query.bind(None::<bool>),
                Some(ValueKind::Integer) => query.bind(None::<i64>),
                Some(ValueKind::Float) => query.bind(None::<f64>),
                Some(ValueKind::Timestamp) => query.bind(None::<NaiveDateTime>),
                Some(ValueKind::Text) => query.bind(None::<String>),
                None => query.bind(N::default()),
            },
            SqlValue::Boolean(v) => query.bind(*v),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Json(v) => query.bind(Json(v.clone())),
        };
    }
    query
}

/// Commit when `outcome` succeeded, otherwise roll back and return the error
pub(crate) async fn finish<DB: Database, T>(
    tx: Transaction<'_, DB>,
    outcome: Result<T>,
) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|e| Error::execution("COMMIT", e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

pub(crate) fn decode_error(column: &str, type_name: &str) -> Error {
    Error::Decode {
        column: column.to_string(),
        type_name: type_name.to_string(),
    }
}

/// Text from a binary column, if it is valid UTF-8
pub(crate) fn bytes_to_text(bytes: Vec<u8>, column: &str, type_name: &str) -> Result<SqlValue> {
    String::from_utf8(bytes)
        .map(SqlValue::Text)
        .map_err(|_| decode_error(column, type_name))
}
