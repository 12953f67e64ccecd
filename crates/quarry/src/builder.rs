//! Fluent query builder.
//!
//! A [`Query`] is created by [`Database::table`](crate::Database::table) and configured by
//! chained calls. Every configuration method validates its arguments immediately and returns
//! `QuarryResult<Self>`, so mistakes surface at the call site before any round trip:
//!
//! ```ignore
//! let active = db
//!     .table("users")
//!     .await?
//!     .select(["id", "name"])?
//!     .where_("status", "active")?
//!     .where_between("age", 18, 65)?
//!     .order_by("name", "ASC")?
//!     .limit(20)?
//!     .get()
//!     .await?;
//! ```
//!
//! Terminal operations ([`get`](Query::get), [`fetch`](Query::fetch),
//! [`count`](Query::count), [`paginate`](Query::paginate), [`chunk`](Query::chunk),
//! [`insert`](Query::insert), [`update`](Query::update)) consume the builder, so no state
//! carries over into the next query.

#[macro_use]
mod macros;

mod relation;
mod render;
mod state;
mod terminal;


pub use relation::{Customizer, RelationKind, RelationQuery};
pub use terminal::Page;

pub(crate) use relation::Relation;
pub(crate) use state::QueryState;

use crate::cache::CacheDirective;
use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::QuarryResult;
use crate::registry::ConnectionHandle;
use crate::value::Params;
use std::sync::Arc;
use std::time::Duration;

/// A projection or group-by list: one comma-separated string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    Raw(String),
    List(Vec<String>),
}

impl Columns {
    /// Render as one comma-separated string.
    pub(crate) fn normalize(self) -> String {
        match self {
            Columns::Raw(s) => s.trim().to_string(),
            Columns::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for Columns {
    fn from(value: &str) -> Self {
        Columns::Raw(value.to_string())
    }
}

impl From<String> for Columns {
    fn from(value: String) -> Self {
        Columns::Raw(value)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(value: Vec<&str>) -> Self {
        Columns::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Columns {
    fn from(value: Vec<String>) -> Self {
        Columns::List(value)
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(value: [&str; N]) -> Self {
        Columns::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Left,
    Right,
    Inner,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Inner => "INNER",
        }
    }
}

/// Query over one table of one connection.
///
/// The connection is captured when the query is created; switching the active connection
/// afterwards does not affect it.
pub struct Query<'db> {
    db: &'db Database,
    handle: ConnectionHandle,
    state: QueryState,
}

impl<'db> Query<'db> {
    pub(crate) fn new(db: &'db Database, handle: ConnectionHandle, state: QueryState) -> Self {
        Self { db, handle, state }
    }

    /// The base table.
    pub fn table_name(&self) -> String {
        self.state.table.parts.join(".")
    }

    /// Name of the connection this query runs on.
    pub fn connection_name(&self) -> &str {
        self.handle.name()
    }

    pub fn dialect(&self) -> Dialect {
        self.state.dialect
    }

    /// The `SELECT` [`get`](Self::get) would run, with its binds.
    pub fn to_sql(&self) -> (String, Params) {
        self.state.render_select()
    }

    /// The `COUNT` [`count`](Self::count) would run, with its binds.
    pub fn to_count_sql(&self) -> (String, Params) {
        self.state.render_count()
    }

    predicate_methods!(owned);

    fluent_methods! { owned:
        /// Skip rows; negative values are rejected.
        fn offset(offset: i64);
        /// Group by a comma list (`"a, b.c"`) or a list of columns (quoted on render).
        fn group_by(columns: impl Into<Columns>);
    }

    /// Join `table` on `table.foreign_key = base.local_key`.
    ///
    /// Unqualified keys are qualified with the joined and base table respectively.
    pub fn join(
        mut self,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        kind: JoinKind,
    ) -> QuarryResult<Self> {
        self.state.join(table, foreign_key, local_key, kind)?;
        Ok(self)
    }

    /// Nest the rows of `table` whose `foreign_key` matches this row's `local_key` as a
    /// list under `alias`.
    pub fn with(
        self,
        alias: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> QuarryResult<Self> {
        self.relation(alias, table, foreign_key, local_key, RelationKind::Many, None)
    }

    /// Nest the first matching row of `table` (or null) under `alias`.
    pub fn with_one(
        self,
        alias: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> QuarryResult<Self> {
        self.relation(alias, table, foreign_key, local_key, RelationKind::One, None)
    }

    /// [`with`](Self::with), customizing the related query.
    pub fn with_using<F>(
        self,
        alias: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        customize: F,
    ) -> QuarryResult<Self>
    where
        F: Fn(&mut RelationQuery) -> QuarryResult<()> + Send + Sync + 'static,
    {
        let customize: Customizer = Arc::new(customize);
        self.relation(
            alias,
            table,
            foreign_key,
            local_key,
            RelationKind::Many,
            Some(customize),
        )
    }

    /// [`with_one`](Self::with_one), customizing the related query.
    pub fn with_one_using<F>(
        self,
        alias: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        customize: F,
    ) -> QuarryResult<Self>
    where
        F: Fn(&mut RelationQuery) -> QuarryResult<()> + Send + Sync + 'static,
    {
        let customize: Customizer = Arc::new(customize);
        self.relation(
            alias,
            table,
            foreign_key,
            local_key,
            RelationKind::One,
            Some(customize),
        )
    }

    fn relation(
        mut self,
        alias: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        kind: RelationKind,
        customize: Option<Customizer>,
    ) -> QuarryResult<Self> {
        let relation = Relation::new(alias, table, foreign_key, local_key, kind, customize)?;
        self.state.add_relation(relation)?;
        Ok(self)
    }

    /// Turn HTML escaping of text values written by [`insert`](Self::insert) and
    /// [`update`](Self::update) on or off. On by default.
    ///
    /// Escaping trims the text and replaces `& < > " '` with entities. Predicate values
    /// are never escaped.
    pub fn secure_input(mut self, enabled: bool) -> Self {
        self.state.secure_input = enabled;
        self
    }

    /// Serve the terminal call from the result cache under `key` for up to `ttl`.
    pub fn cache(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.state.cache = Some(CacheDirective {
            key: key.into(),
            ttl,
        });
        self
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("connection", &self.handle.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
