#![allow(dead_code)]

//! Scripted in-memory connection shared by the integration tests.

use quarry::{
    Connection, ConnectionProfile, Connector, Database, Dialect, ExecOutcome, Params,
    QuarryError, QuarryResult, Row, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type QueryHandler = dyn Fn(&str, &Params) -> QuarryResult<Vec<Row>> + Send + Sync;

/// A statement received by a [`ScriptedConnection`].
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

/// Connection answering table-existence checks from a fixed table list and every other
/// query from a handler closure.
///
/// Existence checks are counted by [`existence_checks`](Self::existence_checks) and kept out
/// of [`statements`](Self::statements), so statement counts only see the queries a builder
/// issued.
pub struct ScriptedConnection {
    dialect: Dialect,
    tables: HashSet<String>,
    handler: Box<QueryHandler>,
    log: Mutex<Vec<Statement>>,
    events: Mutex<Vec<String>>,
    existence_checks: AtomicUsize,
    fail_close: AtomicBool,
}

impl ScriptedConnection {
    pub fn new<F>(dialect: Dialect, tables: &[&str], handler: F) -> Arc<Self>
    where
        F: Fn(&str, &Params) -> QuarryResult<Vec<Row>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            dialect,
            tables: tables.iter().map(|t| t.to_ascii_lowercase()).collect(),
            handler: Box::new(handler),
            log: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            existence_checks: AtomicUsize::new(0),
            fail_close: AtomicBool::new(false),
        })
    }

    /// Statements other than table-existence checks, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().unwrap().clone()
    }

    /// Statements whose SQL contains `needle`.
    pub fn statements_matching(&self, needle: &str) -> Vec<Statement> {
        self.statements()
            .into_iter()
            .filter(|s| s.sql.contains(needle))
            .collect()
    }

    /// Number of table-existence checks answered so far.
    pub fn existence_checks(&self) -> usize {
        self.existence_checks.load(Ordering::SeqCst)
    }

    /// Make `close` report an error (after recording the `close` event).
    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    /// Transaction and lifecycle calls (`begin`, `commit`, `rollback`, `close`).
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &Params) {
        self.log.lock().unwrap().push(Statement {
            sql: sql.to_string(),
            params: params.clone(),
        });
    }
}

#[async_trait::async_trait]
impl Connection for ScriptedConnection {
    async fn query(&self, sql: &str, params: &Params) -> QuarryResult<Vec<Row>> {
        if sql == self.dialect.table_exists_sql() {
            self.existence_checks.fetch_add(1, Ordering::SeqCst);
            let table = params
                .values()
                .first()
                .and_then(|v| v.as_text())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            return Ok(if self.tables.contains(&table) {
                vec![quarry::row! { "1" => 1 }]
            } else {
                Vec::new()
            });
        }
        self.record(sql, params);
        (self.handler)(sql, params)
    }

    async fn execute(&self, sql: &str, params: &Params) -> QuarryResult<ExecOutcome> {
        self.record(sql, params);
        (self.handler)(sql, params)?;
        let outcome = ExecOutcome::new(1);
        Ok(if sql.starts_with("INSERT") {
            outcome.with_last_insert_id(42)
        } else {
            outcome
        })
    }

    async fn begin(&self) -> QuarryResult<()> {
        self.events.lock().unwrap().push("begin".into());
        Ok(())
    }

    async fn commit(&self) -> QuarryResult<()> {
        self.events.lock().unwrap().push("commit".into());
        Ok(())
    }

    async fn rollback(&self) -> QuarryResult<()> {
        self.events.lock().unwrap().push("rollback".into());
        Ok(())
    }

    async fn close(&self) -> QuarryResult<()> {
        self.events.lock().unwrap().push("close".into());
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(QuarryError::connection("connection reset while closing"));
        }
        Ok(())
    }
}

/// Hands out scripted connections by profile database name.
#[derive(Default)]
pub struct ScriptedConnector {
    connections: Mutex<HashMap<String, Arc<ScriptedConnection>>>,
    connection_strings: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(self: &Arc<Self>, database: &str, connection: Arc<ScriptedConnection>) -> Arc<Self> {
        self.connections
            .lock()
            .unwrap()
            .insert(database.to_string(), connection);
        self.clone()
    }

    pub fn connection_strings(&self) -> Vec<String> {
        self.connection_strings.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
        connection_string: &str,
    ) -> QuarryResult<Arc<dyn Connection>> {
        self.connection_strings
            .lock()
            .unwrap()
            .push(connection_string.to_string());
        let database = profile.database.clone().unwrap_or_default();
        let connection = self
            .connections
            .lock()
            .unwrap()
            .get(&database)
            .cloned()
            .ok_or_else(|| QuarryError::connection(format!("no such database '{database}'")))?;
        Ok(connection)
    }
}

pub fn profile(dialect: Dialect, database: &str) -> ConnectionProfile {
    ConnectionProfile::new(dialect)
        .with_host("127.0.0.1")
        .with_username("app")
        .with_password("secret")
        .with_database(database)
}

/// A database whose `default` connection is `connection`.
pub fn database(connection: Arc<ScriptedConnection>) -> Arc<Database> {
    let connector = ScriptedConnector::new().serve("app", connection);
    Database::builder(connector)
        .connection("default", profile(Dialect::MySql, "app"))
        .build()
        .unwrap()
}

/// Parse `LIMIT n` / `OFFSET m` from a MySQL statement.
pub fn limit_offset(sql: &str) -> (Option<usize>, usize) {
    let number_after = |kw: &str| {
        sql.find(kw).and_then(|i| {
            sql[i + kw.len()..]
                .split_whitespace()
                .next()
                .and_then(|n| n.parse::<usize>().ok())
        })
    };
    (number_after(" LIMIT "), number_after(" OFFSET ").unwrap_or(0))
}

/// Apply the statement's LIMIT/OFFSET to `rows`.
pub fn page_of(rows: &[Row], sql: &str) -> Vec<Row> {
    let (limit, offset) = limit_offset(sql);
    rows.iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

/// Rows of `rows` whose `column` loosely equals one of the bound values.
pub fn rows_in(rows: &[Row], column: &str, params: &Params) -> Vec<Row> {
    let wanted: HashSet<String> = params
        .values()
        .into_iter()
        .filter_map(Value::match_key)
        .collect();
    rows.iter()
        .filter(|r| {
            r.get(column)
                .and_then(Value::match_key)
                .is_some_and(|k| wanted.contains(&k))
        })
        .cloned()
        .collect()
}

pub fn count_row(total: usize) -> Vec<Row> {
    vec![quarry::row! { "total" => total as i64 }]
}

pub fn users(n: usize) -> Vec<Row> {
    (1..=n)
        .map(|i| quarry::row! { "id" => i as i64, "name" => format!("user{i}") })
        .collect()
}
