//! High-level database helper

use crate::advisor::{IndexRecommendation, recommend_indexes};
use crate::backend::{Backend, MySqlBackend, PostgresBackend, SqliteBackend};
use crate::config::EngineOptions;
use crate::ddl::TableDefinition;
use crate::dialect::{Dialect, redact_credentials};
use crate::introspect::{self, CatalogQuery};
use crate::params::Statement;
use crate::query_builder::BuiltQuery;
use crate::types::{QueryResult, TableInfo, row_to_json};
use sqlh_core::{DatabaseConfig, Error, Params, Record, Result, Row, SqlValue, ValueKind};
use sqlh_telemetry::{StatementSpanAttributes, record_statement_outcome, statement_span};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Entry point for executing, introspecting and generating SQL against one
/// database.
///
/// Every operation checks a connection out, runs inside its own transaction
/// and releases the connection before returning, whether it succeeded or not.
pub struct DatabaseHelper {
    backend: Arc<dyn Backend>,
    dialect: Dialect,
    options: EngineOptions,
}

impl DatabaseHelper {
    /// Connect with default engine options
    ///
    /// No connection is opened until the first statement runs, so this only
    /// fails for an unsupported dialect or a malformed connection string.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        Self::connect_with_options(connection_string, EngineOptions::default()).await
    }

    pub async fn connect_with_options(
        connection_string: &str,
        options: EngineOptions,
    ) -> Result<Self> {
        let dialect = Dialect::from_connection_string(connection_string)?;
        let backend: Arc<dyn Backend> = match dialect {
            Dialect::Postgres => Arc::new(PostgresBackend::connect_lazy(
                connection_string,
                &options,
            )?),
            Dialect::MySql => Arc::new(MySqlBackend::connect_lazy(connection_string, &options)?),
            Dialect::Sqlite => Arc::new(SqliteBackend::connect_lazy(connection_string, &options)?),
        };

        tracing::info!(
            dialect = %dialect,
            url = %redact_credentials(connection_string),
            max_connections = options.max_connections(),
            "Database helper ready"
        );

        Ok(Self {
            backend,
            dialect,
            options,
        })
    }

    /// Connect using the `[database]` config section
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .connection_string()
            .map_err(|e| Error::config_error(e.to_string()))?;
        Self::connect_with_options(url, EngineOptions::from_config(config)).await
    }

    /// Wrap an existing backend
    pub fn with_backend(backend: Arc<dyn Backend>, options: EngineOptions) -> Self {
        Self {
            dialect: backend.dialect(),
            backend,
            options,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run `sql` with named `params` and time it.
    ///
    /// The time covers checkout, execution, commit and release, and is
    /// reported unrounded.
    ///
    /// # Errors
    /// - [`Error::UnboundParameter`] when a placeholder has no value
    /// - [`Error::Execution`] when the engine rejects the statement; the
    ///   transaction has been rolled back
    pub async fn execute_with_timing(&self, sql: &str, params: &Params) -> Result<QueryResult> {
        let statement = Statement::compile(sql, params, self.dialect)?;
        let span = self.span_for(&statement.sql, statement.args.len());
        self.log_statement(&statement.sql, statement.args.len());

        let start = Instant::now();
        let rows = self
            .backend
            .fetch_all(&statement)
            .instrument(span.clone())
            .await?;
        let elapsed = start.elapsed().as_secs_f64();

        record_statement_outcome(&span, rows.len(), elapsed);
        Ok(QueryResult::new(rows, elapsed))
    }

    /// Run a statement that returns no rows; returns the affected-row count
    pub async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
        let statement = Statement::compile(sql, params, self.dialect)?;
        self.run_batch(vec![statement]).await
    }

    /// Run the output of a [`QueryBuilder`](crate::QueryBuilder)
    pub async fn execute_query(&self, query: &BuiltQuery) -> Result<QueryResult> {
        self.execute_with_timing(&query.sql, &query.params).await
    }

    /// Base tables in `schema` (or the default namespace), sorted by name
    pub async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        let rows = self
            .catalog(introspect::list_tables_query(self.dialect, schema))
            .await?;
        introspect::parse_names(&rows)
    }

    /// Columns, indexes and row count of `table`.
    ///
    /// The row count is best effort: if counting fails the failure is logged
    /// and `row_count` is `None`. Everything else fails loudly.
    pub async fn get_table_schema(&self, table: &str, schema: Option<&str>) -> Result<TableInfo> {
        let columns = introspect::parse_columns(
            &self
                .catalog(introspect::columns_query(self.dialect, table, schema))
                .await?,
        )?;
        if columns.is_empty() {
            return Err(Error::validation(format!("Table '{}' not found", table)));
        }

        let indexes = introspect::parse_indexes(
            &self
                .catalog(introspect::indexes_query(self.dialect, table, schema))
                .await?,
        )?;

        let row_count = self.row_count(table, schema).await;
        let schema = match schema {
            Some(schema) => schema.to_string(),
            None => self.default_schema().await?,
        };

        Ok(TableInfo {
            name: table.to_string(),
            schema,
            columns,
            indexes,
            row_count,
        })
    }

    /// Heuristic index suggestions for `table`; see [`recommend_indexes`]
    pub async fn analyze_indexes(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<IndexRecommendation>> {
        let info = self.get_table_schema(table, schema).await?;
        let recommendations = recommend_indexes(&info.name, &info.columns, &info.indexes);
        tracing::debug!(
            table = %table,
            recommendations = recommendations.len(),
            "Analyzed indexes"
        );
        Ok(recommendations)
    }

    /// Execution plan for `sql`.
    ///
    /// PostgreSQL returns its JSON plan row as an object; the other dialects
    /// return `{"plan": [rows...]}`.
    pub async fn explain_query(&self, sql: &str, params: &Params) -> Result<serde_json::Value> {
        let explain = format!("{} {}", self.dialect.templates().explain_prefix, sql);
        let result = self.execute_with_timing(&explain, params).await?;

        Ok(match self.dialect {
            Dialect::Postgres => result
                .rows
                .first()
                .map(row_to_json)
                .unwrap_or_else(|| serde_json::json!({})),
            Dialect::MySql | Dialect::Sqlite => serde_json::json!({ "plan": result.to_json() }),
        })
    }

    /// Insert `records` into `table` in multi-row batches.
    ///
    /// Each batch takes its column list from its first record, and is split
    /// further so no statement exceeds the engine's bind-parameter limit.
    /// All statements run in one transaction, so either every record is
    /// inserted or none is. `batch_size` defaults to the engine option.
    pub async fn bulk_insert(
        &self,
        table: &str,
        records: &[Record],
        batch_size: Option<usize>,
    ) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let batch_size = batch_size.unwrap_or(self.options.batch_size);
        if batch_size == 0 {
            return Err(Error::validation("batch_size must be greater than zero"));
        }
        let max_binds = self.dialect.templates().max_bind_parameters;

        let mut statements = Vec::new();
        for (n, batch) in records.chunks(batch_size).enumerate() {
            let Some(first) = batch.first() else {
                continue;
            };
            let columns: Vec<&String> = first.keys().collect();
            if columns.is_empty() {
                return Err(Error::validation(format!(
                    "Record {} has no columns",
                    n * batch_size
                )));
            }
            let kinds = column_kinds(&columns, batch);
            let rows_per_statement = (max_binds / columns.len()).clamp(1, batch_size);

            for (m, part) in batch.chunks(rows_per_statement).enumerate() {
                let offset = n * batch_size + m * rows_per_statement;
                statements.push(self.insert_statement(table, &columns, &kinds, part, offset)?);
            }
        }
        let statement_count = statements.len();

        self.run_batch(statements).await?;

        tracing::info!(
            table = %table,
            records = records.len(),
            statements = statement_count,
            "Bulk insert committed"
        );
        Ok(records.len() as u64)
    }

    /// CREATE TABLE for `table`, typed from a sample record
    pub fn create_table_from_record(
        &self,
        table: &str,
        record: &Record,
        primary_key: &str,
    ) -> Result<String> {
        Ok(TableDefinition::from_record(table, record, primary_key)?.render(self.dialect))
    }

    /// CREATE TABLE for a declared table in this helper's dialect
    pub fn create_table_statement(&self, definition: &TableDefinition) -> String {
        definition.render(self.dialect)
    }

    /// Close the pool. Later operations fail with a connection error.
    pub async fn close(&self) {
        self.backend.close().await;
        tracing::debug!(dialect = %self.dialect, "Database helper closed");
    }

    async fn catalog(&self, query: CatalogQuery) -> Result<Vec<Row>> {
        Ok(self.execute_with_timing(&query.sql, &query.params).await?.rows)
    }

    async fn row_count(&self, table: &str, schema: Option<&str>) -> Option<i64> {
        match self.catalog(introspect::row_count_query(table, schema)).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("count"))
                .and_then(SqlValue::as_i64),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Row count unavailable");
                None
            }
        }
    }

    async fn default_schema(&self) -> Result<String> {
        if let Some(schema) = self.dialect.templates().default_schema {
            return Ok(schema.to_string());
        }
        let rows = self.catalog(introspect::current_database_query()).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("name"))
            .and_then(SqlValue::as_str)
            .unwrap_or_default()
            .to_string())
    }

    fn insert_statement(
        &self,
        table: &str,
        columns: &[&String],
        kinds: &[Option<ValueKind>],
        rows: &[Record],
        offset: usize,
    ) -> Result<Statement> {
        let mut args = Vec::with_capacity(columns.len() * rows.len());
        let mut arg_kinds = Vec::with_capacity(args.capacity());
        let mut tuples = Vec::with_capacity(rows.len());
        for (i, record) in rows.iter().enumerate() {
            if record.len() != columns.len() {
                return Err(Error::validation(format!(
                    "Record {} has {} columns, expected {} ({})",
                    offset + i,
                    record.len(),
                    columns.len(),
                    columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
                )));
            }
            let mut placeholders = Vec::with_capacity(columns.len());
            for (column, kind) in columns.iter().zip(kinds) {
                let value = record.get(*column).ok_or_else(|| {
                    Error::validation(format!(
                        "Record {} has no value for column '{}'",
                        offset + i,
                        column
                    ))
                })?;
                args.push(value.clone());
                arg_kinds.push(*kind);
                placeholders.push(self.dialect.placeholder(args.len()));
            }
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "),
            tuples.join(", ")
        );
        Ok(Statement::positional(sql, args).with_arg_kinds(arg_kinds))
    }

    async fn run_batch(&self, statements: Vec<Statement>) -> Result<u64> {
        let first = statements.first().map(|s| s.sql.as_str()).unwrap_or_default();
        let parameter_count = statements.iter().map(|s| s.args.len()).sum();
        let span = self.span_for(first, parameter_count);
        for statement in &statements {
            self.log_statement(&statement.sql, statement.args.len());
        }

        let start = Instant::now();
        let affected = self
            .backend
            .execute_all(&statements)
            .instrument(span.clone())
            .await?;
        record_statement_outcome(&span, affected as usize, start.elapsed().as_secs_f64());
        Ok(affected)
    }

    fn span_for(&self, sql: &str, parameter_count: usize) -> tracing::Span {
        statement_span(&StatementSpanAttributes {
            system: self.dialect.name().to_string(),
            statement: sql.to_string(),
            parameter_count,
        })
    }

    fn log_statement(&self, sql: &str, parameter_count: usize) {
        if self.options.echo {
            tracing::info!(dialect = %self.dialect, parameters = parameter_count, "{}", sql);
        } else {
            tracing::debug!(dialect = %self.dialect, parameters = parameter_count, "{}", sql);
        }
    }
}

/// Kind of each column, taken from its first non-NULL value in `batch`
fn column_kinds(columns: &[&String], batch: &[Record]) -> Vec<Option<ValueKind>> {
    columns
        .iter()
        .map(|column| {
            batch
                .iter()
                .filter_map(|record| record.get(*column))
                .find_map(SqlValue::kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordedCall, RecordingBackend};
    use sqlh_core::{params, record};

    fn recording(dialect: Dialect) -> (Arc<RecordingBackend>, DatabaseHelper) {
        let backend = Arc::new(RecordingBackend::new(dialect));
        let helper = DatabaseHelper::with_backend(backend.clone(), EngineOptions::default());
        (backend, helper)
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_dialect() {
        let result = DatabaseHelper::connect("oracle://scott:tiger@db/orcl").await;
        match result {
            Err(Error::Config(msg)) => {
                assert!(msg.contains("Unsupported dialect"));
                assert!(!msg.contains("tiger"));
            }
            other => panic!("expected config error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_connect_detects_dialect_without_io() {
        let helper = DatabaseHelper::connect("postgresql://u:p@localhost:1/none")
            .await
            .unwrap();
        assert_eq!(helper.dialect(), Dialect::Postgres);
    }

    #[tokio::test]
    async fn test_from_config_requires_url() {
        let config = DatabaseConfig::default();
        let result = DatabaseHelper::from_config(&config).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_named_params_are_rewritten_for_dialect() {
        let (backend, helper) = recording(Dialect::Postgres);
        helper
            .execute_with_timing(
                "SELECT * FROM users WHERE age > :min AND age < :max",
                &params! { "min" => 18, "max" => 65 },
            )
            .await
            .unwrap();

        let statements = backend.statements();
        assert_eq!(statements[0].sql, "SELECT * FROM users WHERE age > $1 AND age < $2");
        assert_eq!(statements[0].args, vec![SqlValue::Integer(18), SqlValue::Integer(65)]);
    }

    #[tokio::test]
    async fn test_unbound_parameter_never_reaches_engine() {
        let (backend, helper) = recording(Dialect::Sqlite);
        let result = helper
            .execute_with_timing("SELECT * FROM t WHERE id = :id", &Params::new())
            .await;
        assert!(matches!(result, Err(Error::UnboundParameter(name)) if name == "id"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_engine_error_is_propagated() {
        let (backend, helper) = recording(Dialect::Sqlite);
        backend.push_failure("no such table: missing");
        let err = helper
            .execute_with_timing("SELECT * FROM missing", &Params::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no such table: missing"));
        assert_eq!(err.statement(), Some("SELECT * FROM missing"));
    }

    #[tokio::test]
    async fn test_bulk_insert_chunks_into_one_transaction() {
        let (backend, helper) = recording(Dialect::Postgres);
        let records: Vec<Record> = (1..=5)
            .map(|i| record! { "id" => i, "name" => format!("n{}", i) })
            .collect();

        let inserted = helper.bulk_insert("people", &records, Some(2)).await.unwrap();
        assert_eq!(inserted, 5);

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        let RecordedCall::Execute(statements) = &calls[0] else {
            panic!("expected a single batch");
        };
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0].sql,
            "INSERT INTO people (id, name) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(statements[2].sql, "INSERT INTO people (id, name) VALUES ($1, $2)");
        assert_eq!(statements[2].args[0], SqlValue::Integer(5));
    }

    #[tokio::test]
    async fn test_bulk_insert_respects_bind_limit() {
        let (backend, helper) = recording(Dialect::Sqlite);
        let wide: Vec<Record> = (0..1000)
            .map(|row| {
                (0..40)
                    .map(|col| (format!("c{}", col), SqlValue::Integer(row * 40 + col)))
                    .collect()
            })
            .collect();

        let inserted = helper.bulk_insert("wide", &wide, None).await.unwrap();
        assert_eq!(inserted, 1000);

        let statements = backend.statements();
        let limit = Dialect::Sqlite.templates().max_bind_parameters;
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.args.len() <= limit));
        assert_eq!(statements[0].args.len(), (limit / 40) * 40);
        let total: usize = statements.iter().map(|s| s.args.len()).sum();
        assert_eq!(total, 40_000);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_insert_types_nulls_from_column_values() {
        let (backend, helper) = recording(Dialect::Postgres);
        let records = vec![
            record! { "id" => 1, "age" => None::<i64>, "note" => None::<String> },
            record! { "id" => 2, "age" => 30, "note" => None::<String> },
        ];
        helper.bulk_insert("people", &records, None).await.unwrap();

        let statement = &backend.statements()[0];
        assert_eq!(statement.null_kind(1), Some(ValueKind::Integer));
        assert_eq!(statement.null_kind(2), None);
        assert_eq!(statement.null_kind(4), Some(ValueKind::Integer));
        assert!(statement.has_untyped_null());
    }

    #[tokio::test]
    async fn test_bulk_insert_edge_cases() {
        let (backend, helper) = recording(Dialect::Sqlite);
        assert_eq!(helper.bulk_insert("t", &[], None).await.unwrap(), 0);

        let records = vec![record! { "a" => 1 }];
        let zero = helper.bulk_insert("t", &records, Some(0)).await;
        assert!(matches!(zero, Err(Error::Validation(_))));

        let mismatched = vec![record! { "a" => 1, "b" => 2 }, record! { "a" => 3, "c" => 4 }];
        let result = helper.bulk_insert("t", &mismatched, None).await;
        match result {
            Err(Error::Validation(msg)) => assert!(msg.contains("'b'")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_row_count_failure_is_absorbed() {
        let (backend, helper) = recording(Dialect::Sqlite);
        backend
            .push_rows(vec![record! {
                "name" => "id",
                "data_type" => "INTEGER",
                "nullable" => 0,
                "default_value" => None::<String>,
                "is_primary_key" => 1,
            }])
            .push_rows(Vec::new())
            .push_failure("not authorized");

        let info = helper.get_table_schema("secret", None).await.unwrap();
        assert_eq!(info.schema, "main");
        assert_eq!(info.row_count, None);
        assert_eq!(info.columns.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table_is_an_error() {
        let (_backend, helper) = recording(Dialect::Sqlite);
        let result = helper.get_table_schema("nope", None).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_explain_wraps_non_postgres_plans() {
        let (backend, helper) = recording(Dialect::Sqlite);
        backend.push_rows(vec![record! { "id" => 2, "detail" => "SCAN users" }]);
        let plan = helper
            .explain_query("SELECT * FROM users", &Params::new())
            .await
            .unwrap();
        assert_eq!(plan["plan"][0]["detail"], "SCAN users");
        assert_eq!(backend.statements()[0].sql, "EXPLAIN SELECT * FROM users");
    }

    #[tokio::test]
    async fn test_explain_returns_postgres_plan_row() {
        let (backend, helper) = recording(Dialect::Postgres);
        backend.push_rows(vec![record! {
            "QUERY PLAN" => serde_json::json!([{ "Plan": { "Node Type": "Seq Scan" } }]),
        }]);
        let plan = helper.explain_query("SELECT 1", &Params::new()).await.unwrap();
        assert_eq!(plan["QUERY PLAN"][0]["Plan"]["Node Type"], "Seq Scan");
        assert_eq!(backend.statements()[0].sql, "EXPLAIN (FORMAT JSON) SELECT 1");
    }

    #[tokio::test]
    async fn test_create_table_uses_helper_dialect() {
        let (_backend, helper) = recording(Dialect::MySql);
        let sql = helper
            .create_table_from_record("people", &record! { "age" => 30, "active" => true }, "id")
            .unwrap();
        assert!(sql.contains("id INT AUTO_INCREMENT PRIMARY KEY"));
        assert!(sql.contains("age INTEGER NOT NULL"));
        assert!(sql.contains("active BOOLEAN NOT NULL"));
    }

    #[tokio::test]
    async fn test_close_is_forwarded() {
        let (backend, helper) = recording(Dialect::Sqlite);
        helper.close().await;
        assert!(backend.is_closed());
        let result = helper.execute_with_timing("SELECT 1", &Params::new()).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
