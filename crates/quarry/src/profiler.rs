//! Per-call query profiling.
//!
//! Every statement issued by a terminal operation runs inside a [`ProfileSpan`] opened with
//! [`Profiler::start`]. Spans are plain values owned by the call that opened them, so
//! nested measurements (eager-load batches under `with:<alias>:<n>`) never overwrite the
//! parent's `main` measurement. Finishing a span produces an immutable [`ProfileRecord`]
//! kept in a bounded history.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry::{Database, ProfilerConfig};
//! use std::time::Duration;
//!
//! let db = Database::builder(connector)
//!     .profiler(
//!         ProfilerConfig::new()
//!             .enable_profiling()
//!             .with_slow_query_threshold(Duration::from_millis(500)),
//!     )
//!     .build()?;
//!
//! let users = db.table("users").await?.get().await?;
//! if let Some(record) = db.profiler().last() {
//!     println!("{} took {} ({})", record.query, record.exec_time, record.speed);
//! }
//! ```

mod format;
mod types;


pub use format::format_exec_time;
pub use types::{ProfileOutcome, ProfileRecord, QueryType, SpeedBucket};

use crate::config::ProfilerConfig;
use crate::placeholder;
use crate::value::{Params, Value};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Identifier of the top-level measurement of a terminal call.
pub const MAIN_IDENTIFIER: &str = "main";

/// An open measurement.
#[derive(Debug)]
pub struct ProfileSpan {
    identifier: String,
    method: String,
    connection: String,
    driver: String,
    query: String,
    params: Params,
    started_at: chrono::DateTime<Utc>,
    started: Instant,
}

impl ProfileSpan {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Collects [`ProfileRecord`]s.
#[derive(Debug)]
pub struct Profiler {
    config: ProfilerConfig,
    history: Mutex<VecDeque<ProfileRecord>>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(config.history.min(1_024))),
            config,
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Open a span. Returns `None` when profiling is disabled.
    pub fn start(
        &self,
        identifier: &str,
        method: &str,
        connection: &str,
        driver: &str,
        query: &str,
        params: &Params,
    ) -> Option<ProfileSpan> {
        if !self.config.enabled {
            return None;
        }
        Some(ProfileSpan {
            identifier: identifier.to_string(),
            method: method.to_string(),
            connection: connection.to_string(),
            driver: driver.to_string(),
            query: query.to_string(),
            params: params.clone(),
            started_at: Utc::now(),
            started: Instant::now(),
        })
    }

    /// Close a span and store its record.
    pub fn finish(
        &self,
        span: ProfileSpan,
        outcome: ProfileOutcome,
        rows: usize,
        payload_bytes: usize,
    ) -> ProfileRecord {
        let duration = span.started.elapsed();
        let full_query = placeholder::substitute(&span.query, &span.params);
        if full_query.is_none() {
            tracing::debug!(
                identifier = %span.identifier,
                "could not reconstruct full query for profiling"
            );
        }

        let record = ProfileRecord {
            query_type: QueryType::from_sql(&span.query),
            binds: span.params.values().into_iter().cloned().collect::<Vec<Value>>(),
            identifier: span.identifier,
            method: span.method,
            connection: span.connection,
            driver: span.driver,
            query: span.query,
            full_query,
            started_at: span.started_at,
            finished_at: Utc::now(),
            duration,
            exec_time: format_exec_time(duration),
            speed: SpeedBucket::from_duration(duration),
            rows,
            payload_bytes,
            outcome,
        };

        if let Some(threshold) = self.config.slow_query_threshold
            && duration >= threshold
        {
            tracing::warn!(
                target: "quarry.slow",
                identifier = %record.identifier,
                method = %record.method,
                connection = %record.connection,
                exec_time = %record.exec_time,
                speed = %record.speed,
                sql = %truncate_sql_bytes(&record.query, 200),
                "slow query"
            );
        }

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        while history.len() >= self.config.history.max(1) {
            history.pop_front();
        }
        history.push_back(record.clone());
        record
    }

    /// Most recent record.
    pub fn last(&self) -> Option<ProfileRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    /// Most recent record with the given identifier.
    pub fn get(&self, identifier: &str) -> Option<ProfileRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|r| r.identifier == identifier)
            .cloned()
    }

    /// All kept records, oldest first.
    pub fn records(&self) -> Vec<ProfileRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
