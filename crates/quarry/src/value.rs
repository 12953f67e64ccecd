//! Dialect-neutral values, rows and statement parameters.
//!
//! Every connection hands rows back as [`Row`]s of [`Value`]s, and every statement is bound
//! with [`Params`]. Eager loading nests related rows under an alias, which is why a value
//! can itself hold a row ([`Value::Row`]) or a list of rows ([`Value::Rows`]).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single column value or bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text value
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date and time without zone
    DateTime(NaiveDateTime),
    /// Binary data
    Bytes(Vec<u8>),
    /// JSON document
    Json(serde_json::Value),
    /// A nested row (load-one relation)
    Row(Row),
    /// A nested list of rows (load-many relation)
    Rows(Vec<Row>),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(1) => Some(true),
            Value::Int(0) => Some(false),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Value::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            Value::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Whether the value is a number (integer or float).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Loose key used to match parent and child rows during eager loading.
    ///
    /// Integers and their textual form produce the same key (`5` and `"5"`), so a driver
    /// that returns a foreign key as text still matches an integer primary key. NULL and
    /// nested values have no key.
    pub fn match_key(&self) -> Option<String> {
        match self {
            Value::Null | Value::Row(_) | Value::Rows(_) | Value::Json(_) => None,
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 => {
                Some((*v as i64).to_string())
            }
            Value::Float(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Some(t.format("%H:%M:%S").to_string()),
            Value::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            Value::Bytes(b) => Some(hex_upper(b)),
        }
    }

    /// Render the value as a SQL literal.
    ///
    /// Only used to reconstruct a readable statement for diagnostics; statements are always
    /// executed with bound parameters.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Bytes(b) => format!("X'{}'", hex_upper(b)),
            Value::Json(j) => quote_literal(&j.to_string()),
            Value::Row(row) => quote_literal(&row.to_json().to_string()),
            Value::Rows(rows) => {
                let list: Vec<serde_json::Value> = rows.iter().map(Row::to_json).collect();
                quote_literal(&serde_json::Value::Array(list).to_string())
            }
        }
    }

    /// Convert to a plain JSON value (no enum tagging).
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Value::Text(s) => Json::String(s.clone()),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Json::String(t.format("%H:%M:%S").to_string()),
            Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            Value::Bytes(b) => Json::String(hex_upper(b)),
            Value::Json(j) => j.clone(),
            Value::Row(row) => row.to_json(),
            Value::Rows(rows) => Json::Array(rows.iter().map(Row::to_json).collect()),
        }
    }

    /// Rough in-memory footprint, used by the profiler.
    pub fn approx_size(&self) -> usize {
        let inline = std::mem::size_of::<Value>();
        inline
            + match self {
                Value::Text(s) => s.len(),
                Value::Bytes(b) => b.len(),
                Value::Json(j) => j.to_string().len(),
                Value::Row(row) => row.approx_size(),
                Value::Rows(rows) => rows.iter().map(Row::approx_size).sum(),
                _ => 0,
            }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{s}"),
            other => match other.match_key() {
                Some(key) => write!(f, "{key}"),
                None => write!(f, "{}", other.to_json()),
            },
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn hex_upper(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02X}");
    }
    out
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Text(v.to_string()),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Row> for Value {
    fn from(v: Row) -> Self {
        Value::Row(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An ordered set of named columns.
///
/// Column order follows the statement's projection. Lookups are exact first; drivers that
/// fold identifiers to upper case (Oracle, Firebird) can be read with
/// [`Row::get_ignore_case`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Get a column value by exact name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Get a column value, falling back to a case-insensitive match.
    pub fn get_ignore_case(&self, column: &str) -> Option<&Value> {
        self.get(column).or_else(|| {
            self.columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, v)| v)
        })
    }

    /// Set a column, replacing (in place) any existing value with the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.columns.push((column, value));
                None
            }
        }
    }

    /// Remove a column by exact name.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let pos = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(pos).1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Convert to a JSON object preserving column order.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.columns.len());
        for (name, value) in &self.columns {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Rough in-memory footprint, used by the profiler.
    pub fn approx_size(&self) -> usize {
        self.columns
            .iter()
            .map(|(name, value)| name.len() + value.approx_size())
            .sum()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```ignore
/// let r = quarry::row! { "id" => 1, "name" => "alice" };
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::Row::new() };
    ($($col:expr => $val:expr),+ $(,)?) => {{
        let mut __quarry_row = $crate::Row::new();
        $( __quarry_row.insert($col, $val); )+
        __quarry_row
    }};
}

/// Parameters bound to a statement.
///
/// Builder-generated statements are always positional (`?`). Raw statements may use named
/// placeholders (`:name`), bound with [`Params::Named`].
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl Params {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Params::Named(
            values
                .into_iter()
                .map(|(k, v)| (k.into().trim_start_matches(':').to_string(), v.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Positional(v) => v.len(),
            Params::Named(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in binding order.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Params::Positional(v) => v.iter().collect(),
            Params::Named(v) => v.iter().map(|(_, v)| v).collect(),
        }
    }

    /// Look up a named parameter.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        match self {
            Params::Positional(_) => None,
            Params::Named(v) => v.iter().find(|(k, _)| k == name).map(|(_, v)| v),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_insert_replaces_in_place() {
        let mut r = row! { "id" => 1, "name" => "alice" };
        let old = r.insert("id", 2);
        assert_eq!(old, Some(Value::Int(1)));
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(r.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn row_ignore_case_lookup() {
        let r = row! { "USER_ID" => 7 };
        assert!(r.get("user_id").is_none());
        assert_eq!(r.get_ignore_case("user_id"), Some(&Value::Int(7)));
    }

    #[test]
    fn match_key_is_loose_between_int_and_text() {
        assert_eq!(Value::Int(5).match_key(), Value::from("5").match_key());
        assert_eq!(Value::Float(5.0).match_key(), Some("5".to_string()));
        assert_eq!(Value::Null.match_key(), None);
    }

    #[test]
    fn sql_literal_escapes_quotes() {
        assert_eq!(Value::from("O'Brien").to_sql_literal(), "'O''Brien'");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_sql_literal(), "X'DEAD'");
    }

    #[test]
    fn to_json_keeps_column_order_and_nesting() {
        let mut parent = row! { "id" => 1 };
        parent.insert("posts", Value::Rows(vec![row! { "title" => "a" }]));
        assert_eq!(
            parent.to_json().to_string(),
            r#"{"id":1,"posts":[{"title":"a"}]}"#
        );
    }

    #[test]
    fn named_params_strip_leading_colon() {
        let p = Params::named([(":id", 1)]);
        assert_eq!(p.get_named("id"), Some(&Value::Int(1)));
        assert_eq!(p.len(), 1);
    }
}
