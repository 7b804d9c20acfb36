//! Fluent SELECT builder
//!
//! Fragments are concatenated as given; conditions are never parsed, so the
//! caller supplies valid SQL for the target dialect. Parameter names used in
//! conditions are only checked when the query is executed.

use serde::{Deserialize, Serialize};
use sqlh_core::{Error, Params, Result};
use std::fmt;

/// Kind of JOIN clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        };
        write!(f, "{}", keyword)
    }
}

/// Rendered SQL and the parameters supplied to [`QueryBuilder::build`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Params,
}

/// Accumulates the parts of a SELECT against one table
///
/// # Example
/// ```
/// use sqlh_database::QueryBuilder;
/// use sqlh_core::params;
///
/// let query = QueryBuilder::new("users")
///     .select(["id", "username"])
///     .and_where("age >= :min_age")
///     .order_by("username")
///     .limit(10)
///     .build(params! { "min_age" => 18 })
///     .unwrap();
/// assert_eq!(
///     query.sql,
///     "SELECT id, username\nFROM users\nWHERE age >= :min_age\nORDER BY username\nLIMIT 10"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    conditions: Vec<String>,
    joins: Vec<String>,
    order_by: Option<String>,
    group_by: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    /// Start a query selecting every column of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec!["*".to_string()],
            conditions: Vec::new(),
            joins: Vec::new(),
            order_by: None,
            group_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Replace the projection list
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a condition; all conditions are combined with AND
    pub fn and_where(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Add an INNER JOIN
    pub fn join(self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.join_with(JoinType::Inner, table, on)
    }

    pub fn join_with(
        mut self,
        join_type: JoinType,
        table: impl Into<String>,
        on: impl Into<String>,
    ) -> Self {
        self.joins
            .push(format!("{} JOIN {} ON {}", join_type, table.into(), on.into()));
        self
    }

    /// Set the ORDER BY expression, replacing any earlier one
    pub fn order_by(mut self, expression: impl Into<String>) -> Self {
        self.order_by = Some(expression.into());
        self
    }

    /// Set the GROUP BY expression, replacing any earlier one
    pub fn group_by(mut self, expression: impl Into<String>) -> Self {
        self.group_by = Some(expression.into());
        self
    }

    /// Set the row limit; a limit of zero is not rendered
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the query. Does not change the builder, so repeated calls
    /// give the same result.
    pub fn build(&self, params: Params) -> Result<BuiltQuery> {
        if self.columns.is_empty() {
            return Err(Error::validation(format!(
                "Query on '{}' selects no columns",
                self.table
            )));
        }

        let mut clauses = vec![
            format!("SELECT {}", self.columns.join(", ")),
            format!("FROM {}", self.table),
        ];
        clauses.extend(self.joins.iter().cloned());

        if !self.conditions.is_empty() {
            clauses.push(format!("WHERE {}", self.conditions.join(" AND ")));
        }
        if let Some(group_by) = &self.group_by {
            clauses.push(format!("GROUP BY {}", group_by));
        }
        if let Some(order_by) = &self.order_by {
            clauses.push(format!("ORDER BY {}", order_by));
        }
        if let Some(limit) = self.limit.filter(|n| *n > 0) {
            clauses.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        Ok(BuiltQuery {
            sql: clauses.join("\n"),
            params,
        })
    }
}
