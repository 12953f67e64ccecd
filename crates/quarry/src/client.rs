//! Driver boundary.
//!
//! quarry renders SQL and binds parameters; talking to the server is left to a
//! [`Connection`] implementation. Statements arrive with `?` (or, for raw statements,
//! `:name`) placeholders and a matching [`Params`] list. A [`Connector`] turns a stored
//! [`ConnectionProfile`] into a live handle the first time a connection name is used.

use crate::config::ConnectionProfile;
use crate::error::QuarryResult;
use crate::value::{Params, Row, Value};
use std::sync::Arc;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutcome {
    /// Number of rows affected.
    pub affected: u64,
    /// Identifier generated by an `INSERT`, when the driver reports one.
    pub last_insert_id: Option<Value>,
}

impl ExecOutcome {
    pub fn new(affected: u64) -> Self {
        Self {
            affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: impl Into<Value>) -> Self {
        self.last_insert_id = Some(id.into());
        self
    }
}

/// A live database handle.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Execute a query and return all rows.
    async fn query(&self, sql: &str, params: &Params) -> QuarryResult<Vec<Row>>;

    /// Execute a statement and report affected rows.
    async fn execute(&self, sql: &str, params: &Params) -> QuarryResult<ExecOutcome>;

    /// Start a transaction.
    async fn begin(&self) -> QuarryResult<()>;

    /// Commit the current transaction.
    async fn commit(&self) -> QuarryResult<()>;

    /// Roll back the current transaction.
    async fn rollback(&self) -> QuarryResult<()>;

    /// Release the handle. The default does nothing.
    async fn close(&self) -> QuarryResult<()> {
        Ok(())
    }
}

/// Produces live handles from connection profiles.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection.
    ///
    /// `connection_string` is the dialect-specific string derived from `profile`.
    async fn connect(
        &self,
        profile: &ConnectionProfile,
        connection_string: &str,
    ) -> QuarryResult<Arc<dyn Connection>>;
}
