//! # sqlh Telemetry
//!
//! Tracing setup and statement spans for the database helpers.
//!
//! Span attributes follow the OpenTelemetry semantic conventions for database
//! client calls so exported traces line up with other instrumented services.

mod spans;
mod tracer;

pub use spans::{StatementSpanAttributes, record_statement_outcome, statement_span};
pub use tracer::{
    init_telemetry, init_telemetry_with_filter, register_span_processor, tracer_provider,
};

/// OpenTelemetry span attribute constants for database calls.
pub mod attributes {
    pub const DB_SYSTEM: &str = "db.system";
    pub const DB_OPERATION: &str = "db.operation";
    pub const DB_STATEMENT: &str = "db.statement";
    pub const DB_PARAMETER_COUNT: &str = "db.parameter_count";
    pub const DB_ROWS: &str = "db.rows";
    pub const DB_DURATION_SECS: &str = "db.duration_secs";

    // Instrumentation scope name
    pub const SYSTEM_NAME: &str = "sqlh";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_constants() {
        assert_eq!(attributes::DB_SYSTEM, "db.system");
        assert_eq!(attributes::DB_STATEMENT, "db.statement");
        assert_eq!(attributes::SYSTEM_NAME, "sqlh");
    }
}
