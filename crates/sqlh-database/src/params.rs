//! Named-parameter rewriting
//!
//! Callers write `:name` placeholders; the engines only understand positional
//! ones. [`Statement::compile`] rewrites the text for a dialect and collects
//! the values in placeholder order.

use crate::dialect::Dialect;
use sqlh_core::{Error, Params, Result, SqlValue, ValueKind};

/// A statement ready for the engine: positional SQL plus its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
    /// Column kind per argument, when known. Only consulted for NULLs.
    pub arg_kinds: Vec<Option<ValueKind>>,
}

impl Statement {
    /// A statement whose SQL is already positional
    pub fn positional(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
            arg_kinds: Vec::new(),
        }
    }

    /// Attach per-argument kinds so NULLs can be bound with a concrete type
    pub fn with_arg_kinds(mut self, kinds: Vec<Option<ValueKind>>) -> Self {
        self.arg_kinds = kinds;
        self
    }

    /// Kind to bind argument `index` with if it is NULL
    pub fn null_kind(&self, index: usize) -> Option<ValueKind> {
        self.arg_kinds.get(index).copied().flatten()
    }

    /// Whether some NULL argument has no known kind
    pub fn has_untyped_null(&self) -> bool {
        self.args
            .iter()
            .enumerate()
            .any(|(i, arg)| arg.is_null() && self.null_kind(i).is_none())
    }

    /// Rewrite `:name` placeholders in `sql` for `dialect`.
    ///
    /// Text inside quotes and comments and PostgreSQL `::type` casts are left
    /// alone. Each occurrence gets its own positional slot, so a name used
    /// twice is bound twice. Supplied parameters that never appear are ignored.
    ///
    /// # Example
    /// ```
    /// use sqlh_core::params;
    /// use sqlh_database::{Dialect, Statement};
    ///
    /// let stmt = Statement::compile(
    ///     "SELECT * FROM users WHERE age > :min_age",
    ///     &params! { "min_age" => 18 },
    ///     Dialect::Postgres,
    /// ).unwrap();
    /// assert_eq!(stmt.sql, "SELECT * FROM users WHERE age > $1");
    /// ```
    pub fn compile(sql: &str, params: &Params, dialect: Dialect) -> Result<Self> {
        let bytes = sql.as_bytes();
        let backslash_escapes = dialect == Dialect::MySql;

        let mut out = String::with_capacity(sql.len());
        let mut args = Vec::new();
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            let next = bytes.get(i + 1).copied();
            match bytes[i] {
                b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i, backslash_escapes),
                b'-' if next == Some(b'-') => i = skip_line_comment(bytes, i),
                b'/' if next == Some(b'*') => i = skip_block_comment(bytes, i),
                b':' if next == Some(b':') => i += 2,
                b':' if next.is_some_and(is_name_start) => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && is_name_char(bytes[end]) {
                        end += 1;
                    }
                    let name = &sql[start..end];
                    let value = params
                        .get(name)
                        .ok_or_else(|| Error::UnboundParameter(name.to_string()))?;

                    out.push_str(&sql[copied..i]);
                    args.push(value.clone());
                    out.push_str(&dialect.placeholder(args.len()));

                    i = end;
                    copied = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&sql[copied..]);

        Ok(Self::positional(out, args))
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index just past the closing quote; doubled quotes re-enter on the next pass
fn skip_quoted(bytes: &[u8], open: usize, backslash_escapes: bool) -> usize {
    let quote = bytes[open];
    let mut j = open + 1;
    while j < bytes.len() {
        if backslash_escapes && bytes[j] == b'\\' {
            j += 2;
            continue;
        }
        if bytes[j] == quote {
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| start + p + 1)
        .unwrap_or(bytes.len())
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map(|p| start + 2 + p + 2)
        .unwrap_or(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlh_core::params;

    #[test]
    fn test_rewrites_for_numbered_dialect() {
        let stmt = Statement::compile(
            "SELECT * FROM t WHERE a > :x AND b = :y",
            &params! { "x" => 1, "y" => "two" },
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE a > $1 AND b = $2");
        assert_eq!(
            stmt.args,
            vec![SqlValue::Integer(1), SqlValue::Text("two".to_string())]
        );
    }

    #[test]
    fn test_rewrites_for_question_mark_dialect() {
        let stmt = Statement::compile(
            "UPDATE t SET a = :a WHERE id = :id",
            &params! { "a" => true, "id" => 7 },
            Dialect::Sqlite,
        )
        .unwrap();
        assert_eq!(stmt.sql, "UPDATE t SET a = ? WHERE id = ?");
        assert_eq!(stmt.args, vec![SqlValue::Boolean(true), SqlValue::Integer(7)]);
    }

    #[test]
    fn test_repeated_name_is_bound_per_occurrence() {
        let stmt = Statement::compile(
            "SELECT :v AS a, :v AS b",
            &params! { "v" => 5 },
            Dialect::MySql,
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT ? AS a, ? AS b");
        assert_eq!(stmt.args.len(), 2);
    }

    #[test]
    fn test_leaves_casts_quotes_and_comments_alone() {
        let sql = "SELECT name::text, ':skip', \":ident\" -- :comment\nFROM t /* :block */ WHERE a = :a";
        let stmt = Statement::compile(sql, &params! { "a" => 1 }, Dialect::Postgres).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT name::text, ':skip', \":ident\" -- :comment\nFROM t /* :block */ WHERE a = $1"
        );
        assert_eq!(stmt.args, vec![SqlValue::Integer(1)]);
    }

    #[test]
    fn test_doubled_quotes_inside_literal() {
        let stmt = Statement::compile(
            "SELECT 'it''s :not' WHERE x = :x",
            &params! { "x" => 1 },
            Dialect::Sqlite,
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT 'it''s :not' WHERE x = ?");
    }

    #[test]
    fn test_mysql_backslash_escape_in_literal() {
        let stmt = Statement::compile(
            r"SELECT 'a\' :no' , :yes",
            &params! { "yes" => 1 },
            Dialect::MySql,
        )
        .unwrap();
        assert_eq!(stmt.sql, r"SELECT 'a\' :no' , ?");
    }

    #[test]
    fn test_unbound_parameter() {
        let err = Statement::compile("SELECT * FROM t WHERE a > :missing", &Params::new(), Dialect::Sqlite)
            .unwrap_err();
        assert!(matches!(err, Error::UnboundParameter(name) if name == "missing"));
    }

    #[test]
    fn test_unused_parameters_are_ignored() {
        let stmt = Statement::compile("SELECT 1", &params! { "extra" => 1 }, Dialect::Sqlite).unwrap();
        assert_eq!(stmt.sql, "SELECT 1");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        let stmt = Statement::compile(
            "SELECT 'héllo' AS grüß WHERE a = :a",
            &params! { "a" => "ü" },
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT 'héllo' AS grüß WHERE a = $1");
    }

    #[test]
    fn test_null_kinds() {
        let stmt = Statement::positional(
            "INSERT INTO t (a, b, c) VALUES (?, ?, ?)",
            vec![SqlValue::Null, SqlValue::Null, SqlValue::Integer(1)],
        );
        assert!(stmt.has_untyped_null());

        let stmt = stmt.with_arg_kinds(vec![
            Some(ValueKind::Integer),
            Some(ValueKind::Boolean),
            Some(ValueKind::Integer),
        ]);
        assert_eq!(stmt.null_kind(1), Some(ValueKind::Boolean));
        assert_eq!(stmt.null_kind(7), None);
        assert!(!stmt.has_untyped_null());

        let compiled =
            Statement::compile("UPDATE t SET a = :a", &params! { "a" => None::<i64> }, Dialect::Postgres)
                .unwrap();
        assert!(compiled.has_untyped_null());
    }

    #[test]
    fn test_mysql_assignment_operator() {
        let stmt = Statement::compile("SET @x := 1", &Params::new(), Dialect::MySql).unwrap();
        assert_eq!(stmt.sql, "SET @x := 1");
    }
}
