//! Index recommendations from column-naming conventions
//!
//! This is a heuristic over column names only. It reads no statistics, query
//! logs or plans, and a recommendation is a hint rather than a guarantee that
//! the index will help.
//!
//! Two rules run independently for every column:
//! - a name ending in `_id` is treated as a foreign key (high benefit)
//! - a name containing `date` or `timestamp`, in any case, is treated as
//!   temporal (medium benefit)
//!
//! A column matching both rules yields two recommendations. Only existing
//! single-column indexes suppress a rule; composite indexes are ignored.

use crate::ddl::create_index_statement;
use crate::types::{ColumnInfo, IndexInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which naming rule produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ForeignKeyLike,
    Temporal,
}

impl RecommendationKind {
    pub fn reason(self) -> &'static str {
        match self {
            RecommendationKind::ForeignKeyLike => "foreign-key-like column should be indexed",
            RecommendationKind::Temporal => "temporal column frequently filtered/sorted",
        }
    }

    pub fn benefit(self) -> Benefit {
        match self {
            RecommendationKind::ForeignKeyLike => Benefit::High,
            RecommendationKind::Temporal => Benefit::Medium,
        }
    }

    fn matches(self, column: &str) -> bool {
        match self {
            RecommendationKind::ForeignKeyLike => column.ends_with("_id"),
            RecommendationKind::Temporal => {
                let lower = column.to_lowercase();
                lower.contains("timestamp") || lower.contains("date")
            }
        }
    }
}

/// Estimated benefit tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benefit {
    High,
    Medium,
}

impl fmt::Display for Benefit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Benefit::High => write!(f, "high"),
            Benefit::Medium => write!(f, "medium"),
        }
    }
}

/// A suggested index for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecommendation {
    pub table: String,
    pub columns: Vec<String>,
    pub kind: RecommendationKind,
    pub reason: String,
    pub estimated_benefit: Benefit,
    pub create_statement: String,
}

impl IndexRecommendation {
    fn new(table: &str, column: &str, kind: RecommendationKind) -> Self {
        Self {
            table: table.to_string(),
            columns: vec![column.to_string()],
            kind,
            reason: format!("{} ({})", kind.reason(), column),
            estimated_benefit: kind.benefit(),
            create_statement: create_index_statement(table, column),
        }
    }
}

impl fmt::Display for IndexRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.estimated_benefit, self.reason, self.create_statement
        )
    }
}

const RULES: [RecommendationKind; 2] = [
    RecommendationKind::ForeignKeyLike,
    RecommendationKind::Temporal,
];

/// Recommend indexes for `table`, in column order, foreign-key rule first
pub fn recommend_indexes(
    table: &str,
    columns: &[ColumnInfo],
    indexes: &[IndexInfo],
) -> Vec<IndexRecommendation> {
    let indexed: HashSet<&str> = indexes
        .iter()
        .filter_map(|idx| match idx.columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        })
        .collect();

    columns
        .iter()
        .filter(|col| !indexed.contains(col.name.as_str()))
        .flat_map(|col| {
            RULES
                .iter()
                .filter(|rule| rule.matches(&col.name))
                .map(|rule| IndexRecommendation::new(table, &col.name, *rule))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: "INTEGER".to_string(),
            nullable: true,
            default_value: None,
            is_primary_key: false,
        }
    }

    fn index(name: &str, columns: &[&str]) -> IndexInfo {
        IndexInfo {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            is_unique: false,
        }
    }

    #[test]
    fn test_foreign_key_like_column() {
        let recs = recommend_indexes("orders", &[column("id"), column("user_id")], &[]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::ForeignKeyLike);
        assert_eq!(recs[0].estimated_benefit, Benefit::High);
        assert_eq!(recs[0].columns, vec!["user_id"]);
        assert_eq!(
            recs[0].create_statement,
            "CREATE INDEX idx_orders_user_id ON orders(user_id);"
        );
        assert!(recs[0].reason.contains("user_id"));
    }

    #[test]
    fn test_single_column_index_suppresses_rule() {
        let recs = recommend_indexes(
            "orders",
            &[column("user_id")],
            &[index("idx_orders_user_id", &["user_id"])],
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn test_composite_index_does_not_count() {
        let recs = recommend_indexes(
            "orders",
            &[column("user_id")],
            &[index("idx_combo", &["user_id", "status"])],
        );
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_temporal_match_is_case_insensitive() {
        let recs = recommend_indexes(
            "events",
            &[column("CreatedDate"), column("LAST_TIMESTAMP"), column("name")],
            &[],
        );
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.kind == RecommendationKind::Temporal));
        assert!(recs.iter().all(|r| r.estimated_benefit == Benefit::Medium));
    }

    #[test]
    fn test_column_matching_both_rules_yields_two() {
        let recs = recommend_indexes("t", &[column("created_date_id")], &[]);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].kind, RecommendationKind::ForeignKeyLike);
        assert_eq!(recs[1].kind, RecommendationKind::Temporal);
        assert_eq!(recs[0].create_statement, recs[1].create_statement);
    }

    #[test]
    fn test_suffix_match_is_literal() {
        let recs = recommend_indexes("t", &[column("USER_ID"), column("idea")], &[]);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_benefit_display() {
        assert_eq!(Benefit::High.to_string(), "high");
        assert_eq!(Benefit::Medium.to_string(), "medium");
    }
}
