//! Values exchanged with the database

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Timestamp text layout used when a timestamp has to travel as a string
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Semantic kind of a column, used when generating DDL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
}

impl ValueKind {
    /// SQL type name for columns of this kind
    pub fn sql_type(self) -> &'static str {
        match self {
            ValueKind::Text => "VARCHAR(255)",
            ValueKind::Integer => "INTEGER",
            ValueKind::Float => "FLOAT",
            ValueKind::Boolean => "BOOLEAN",
            ValueKind::Timestamp => "TIMESTAMP",
        }
    }
}

/// A single value bound to, or read from, a statement
///
/// Serialized with an explicit tag, e.g. `{"type": "text", "value": "a"}`,
/// so every variant survives a round trip unchanged. Timestamps use
/// [`TIMESTAMP_FORMAT`], the same layout as [`SqlValue::to_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    #[serde(with = "timestamp_text")]
    Timestamp(NaiveDateTime),
    Text(String),
    Json(serde_json::Value),
}

mod timestamp_text {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

impl SqlValue {
    /// The DDL kind of this value; `None` for NULL and JSON documents
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            SqlValue::Null | SqlValue::Json(_) => None,
            SqlValue::Boolean(_) => Some(ValueKind::Boolean),
            SqlValue::Integer(_) => Some(ValueKind::Integer),
            SqlValue::Float(_) => Some(ValueKind::Float),
            SqlValue::Timestamp(_) => Some(ValueKind::Timestamp),
            SqlValue::Text(_) => Some(ValueKind::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(v) => Some(*v),
            SqlValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Boolean(v) => Some(*v),
            SqlValue::Integer(0) => Some(false),
            SqlValue::Integer(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Convert into a plain JSON value; timestamps become strings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Boolean(v) => serde_json::Value::Bool(*v),
            SqlValue::Integer(v) => serde_json::Value::from(*v),
            SqlValue::Float(v) => serde_json::Value::from(*v),
            SqlValue::Timestamp(v) => {
                serde_json::Value::String(v.format(TIMESTAMP_FORMAT).to_string())
            }
            SqlValue::Text(v) => serde_json::Value::String(v.clone()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Boolean(v) => write!(f, "{}", v),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
            SqlValue::Text(v) => write!(f, "{}", v),
            SqlValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Boolean(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A result row or an input record; preserves column order
pub type Row = IndexMap<String, SqlValue>;

/// A record to insert; same shape as a result row
pub type Record = IndexMap<String, SqlValue>;

/// Named statement parameters, keyed without the leading colon
pub type Params = HashMap<String, SqlValue>;

/// Build a [`Params`] map from `name => value` pairs
///
/// # Example
/// ```
/// use sqlh_core::{params, SqlValue};
/// let p = params! { "min_age" => 18, "status" => "active" };
/// assert_eq!(p["min_age"], SqlValue::Integer(18));
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::value::Params::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::value::Params::new();
        $( params.insert(($name).to_string(), $crate::value::SqlValue::from($value)); )+
        params
    }};
}

/// Build a [`Record`] from `name => value` pairs, keeping their order
#[macro_export]
macro_rules! record {
    ($($name:expr => $value:expr),* $(,)?) => {{
        let mut record = $crate::value::Record::new();
        $( record.insert(($name).to_string(), $crate::value::SqlValue::from($value)); )*
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_kind_of_scalars() {
        assert_eq!(SqlValue::from("a").kind(), Some(ValueKind::Text));
        assert_eq!(SqlValue::from(30).kind(), Some(ValueKind::Integer));
        assert_eq!(SqlValue::from(1.5).kind(), Some(ValueKind::Float));
        assert_eq!(SqlValue::from(true).kind(), Some(ValueKind::Boolean));
        assert_eq!(SqlValue::Null.kind(), None);

        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(SqlValue::from(ts).kind(), Some(ValueKind::Timestamp));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".to_string()));
    }

    #[test]
    fn test_record_macro_keeps_order() {
        let record = crate::record! { "name" => "Alice", "age" => 30, "active" => true };
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "active"]);
    }

    #[test]
    fn test_serde_round_trip_keeps_variants() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 250)
            .unwrap();
        let values = vec![
            SqlValue::Null,
            SqlValue::Boolean(false),
            SqlValue::Integer(7),
            SqlValue::Float(2.5),
            SqlValue::Timestamp(ts),
            SqlValue::Text("2024-01-02T03:04:05".to_string()),
            SqlValue::Text("2024-01-02 03:04:05".to_string()),
            SqlValue::Json(serde_json::json!({ "k": [1, 2] })),
        ];

        let encoded = serde_json::to_string(&values).unwrap();
        let decoded: Vec<SqlValue> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_timestamp_layout_matches_to_json() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let value = SqlValue::Timestamp(ts);
        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(encoded["type"], "timestamp");
        assert_eq!(encoded["value"], value.to_json());
        assert_eq!(encoded["value"], "2024-01-02 03:04:05");
    }

    #[test]
    fn test_to_json() {
        assert_eq!(SqlValue::Integer(3).to_json(), serde_json::json!(3));
        assert_eq!(SqlValue::Null.to_json(), serde_json::Value::Null);
    }
}
