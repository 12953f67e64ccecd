use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., DDL, custom)
    Other,
}

impl QueryType {
    /// Detect query type from the leading keyword of a SQL string.
    ///
    /// `WITH ...` is treated as a SELECT.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        let keyword: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            _ => QueryType::Other,
        }
    }
}

/// Coarse speed classification of a finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedBucket {
    /// Up to 0.5s
    VeryFast,
    /// Over 0.5s, up to 1.5s
    Fast,
    /// Over 1.5s, up to 4s
    Slow,
    /// Over 4s
    VerySlow,
}

impl SpeedBucket {
    pub fn from_duration(d: Duration) -> Self {
        let ms = d.as_millis();
        if ms <= 500 {
            SpeedBucket::VeryFast
        } else if ms <= 1_500 {
            SpeedBucket::Fast
        } else if ms <= 4_000 {
            SpeedBucket::Slow
        } else {
            SpeedBucket::VerySlow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedBucket::VeryFast => "very fast",
            SpeedBucket::Fast => "fast",
            SpeedBucket::Slow => "slow",
            SpeedBucket::VerySlow => "very slow",
        }
    }
}

impl fmt::Display for SpeedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maximum length for error messages in `ProfileOutcome::Error`.
const MAX_ERROR_LEN: usize = 512;

/// How a profiled call ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileOutcome {
    /// Query returned rows.
    Rows(usize),
    /// Statement affected rows.
    Affected(u64),
    /// Call failed (message truncated to 512 bytes).
    Error(String),
}

impl ProfileOutcome {
    /// Create an error outcome, truncating long messages.
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for ProfileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileOutcome::Rows(n) => write!(f, "{n} rows"),
            ProfileOutcome::Affected(n) => write!(f, "{n} affected"),
            ProfileOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// A finished, immutable measurement of one call.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRecord {
    /// Span label: `main`, or `with:<alias>:<n>` for eager-load batches.
    pub identifier: String,
    /// Builder method that issued the statement (`get`, `count`, ...).
    pub method: String,
    pub connection: String,
    pub driver: String,
    pub query_type: QueryType,
    /// Statement as sent, with placeholders.
    pub query: String,
    pub binds: Vec<Value>,
    /// Statement with binds substituted, for display only.
    pub full_query: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
    /// Human-readable duration (`12ms`, `1s 200ms`, ...).
    pub exec_time: String,
    pub speed: SpeedBucket,
    /// Rows returned (0 for statements).
    pub rows: usize,
    /// Approximate size of the returned rows in bytes.
    pub payload_bytes: usize,
    pub outcome: ProfileOutcome,
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1_000.0)
}
