//! Span creation helpers for statement execution

use crate::attributes::*;

/// Attributes for tracing one statement
#[derive(Debug, Clone)]
pub struct StatementSpanAttributes {
    /// Database system identifier ("postgresql", "mysql", "sqlite")
    pub system: String,
    pub statement: String,
    pub parameter_count: usize,
}

impl StatementSpanAttributes {
    /// Leading SQL keyword, upper-cased ("SELECT", "INSERT", ...)
    pub fn operation(&self) -> String {
        self.statement
            .split_whitespace()
            .next()
            .map(|word| word.trim_start_matches('(').to_uppercase())
            .unwrap_or_default()
    }
}

/// Create a span covering a statement's checkout, execution and release.
///
/// Row count and duration are declared empty and filled in by
/// [`record_statement_outcome`] once the statement finishes.
pub fn statement_span(attrs: &StatementSpanAttributes) -> tracing::Span {
    tracing::info_span!(
        "db.statement",
        { DB_SYSTEM } = %attrs.system,
        { DB_OPERATION } = %attrs.operation(),
        { DB_STATEMENT } = %attrs.statement,
        { DB_PARAMETER_COUNT } = attrs.parameter_count,
        { DB_ROWS } = tracing::field::Empty,
        { DB_DURATION_SECS } = tracing::field::Empty,
    )
}

/// Record the result size and wall-clock duration on a statement span
pub fn record_statement_outcome(span: &tracing::Span, rows: usize, duration_secs: f64) {
    span.record(DB_ROWS, rows);
    span.record(DB_DURATION_SECS, duration_secs);
}
