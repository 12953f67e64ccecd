//! SQL dialects.
//!
//! [`Dialect`] is a closed set of supported back ends. Each variant delegates to a
//! [`DialectAdapter`] implementation that knows the driver-specific bits of SQL:
//!
//! - the table existence check
//! - row limiting (`LIMIT`/`OFFSET`, `TOP`/`OFFSET ... FETCH`, `ROWNUM`, `FIRST`/`SKIP`)
//! - date-part functions used by `where_date` and friends
//! - identifier quoting
//! - the connection string handed to a [`Connector`](crate::Connector)

use crate::config::ConnectionProfile;
use crate::error::{QuarryError, QuarryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod firebird;
mod mssql;
mod mysql;
mod oracle;


pub use firebird::FirebirdAdapter;
pub use mssql::MsSqlAdapter;
pub use mysql::MySqlAdapter;
pub use oracle::OracleAdapter;

/// The part of a date column compared by a date predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    /// Calendar date (time of day discarded)
    Date,
    Month,
    Day,
    Year,
}

/// Driver-specific SQL behavior.
pub trait DialectAdapter: Send + Sync {
    /// Driver name as written in configuration.
    fn name(&self) -> &'static str;

    /// Connection string for a profile. Required fields are checked by the caller.
    fn connection_string(&self, profile: &ConnectionProfile) -> QuarryResult<String>;

    /// Statement returning at least one row when the table exists.
    ///
    /// Takes the table name as its single positional parameter.
    fn table_exists_sql(&self) -> &'static str;

    /// Quote one identifier part.
    fn quote_ident(&self, part: &str) -> String;

    /// Apply a row limit and/or offset to a rendered `SELECT`.
    ///
    /// `has_order` tells whether `sql` already ends with an `ORDER BY` clause.
    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: Option<u64>, has_order: bool)
    -> String;

    /// Expression extracting `part` from `column`.
    fn date_part(&self, part: DatePart, column: &str) -> String;

    /// Placeholder expression a `YYYY-MM-DD` string is bound through.
    fn date_placeholder(&self) -> &'static str {
        "?"
    }

    /// Wrap a grouped `SELECT` so it can be counted.
    fn count_wrapper(&self, inner: &str) -> String {
        format!("SELECT COUNT(*) AS total FROM ({inner}) quarry_count")
    }

    /// Helper column introduced by [`apply_limit`](Self::apply_limit), stripped from results.
    fn row_number_alias(&self) -> Option<&'static str> {
        None
    }
}

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    MySql,
    MsSql,
    Oracle,
    Firebird,
}

impl Dialect {
    /// The adapter implementing this dialect.
    pub fn adapter(self) -> &'static dyn DialectAdapter {
        match self {
            Dialect::MySql => &MySqlAdapter,
            Dialect::MsSql => &MsSqlAdapter,
            Dialect::Oracle => &OracleAdapter,
            Dialect::Firebird => &FirebirdAdapter,
        }
    }

    pub fn name(self) -> &'static str {
        self.adapter().name()
    }

    pub fn connection_string(self, profile: &ConnectionProfile) -> QuarryResult<String> {
        self.adapter().connection_string(profile)
    }

    pub fn table_exists_sql(self) -> &'static str {
        self.adapter().table_exists_sql()
    }

    pub fn quote_ident(self, part: &str) -> String {
        self.adapter().quote_ident(part)
    }

    pub fn apply_limit(
        self,
        sql: &str,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order: bool,
    ) -> String {
        if limit.is_none() && offset.is_none() {
            return sql.to_string();
        }
        self.adapter().apply_limit(sql, limit, offset, has_order)
    }

    pub fn date_part(self, part: DatePart, column: &str) -> String {
        self.adapter().date_part(part, column)
    }

    pub fn date_placeholder(self) -> &'static str {
        self.adapter().date_placeholder()
    }

    pub fn count_wrapper(self, inner: &str) -> String {
        self.adapter().count_wrapper(inner)
    }

    pub fn row_number_alias(self) -> Option<&'static str> {
        self.adapter().row_number_alias()
    }

    /// Whether the database is named by a required `database` setting.
    pub(crate) fn requires_database(self) -> bool {
        !matches!(self, Dialect::Firebird)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "mssql" | "sqlsrv" => Ok(Dialect::MsSql),
            "oracle" | "oci" => Ok(Dialect::Oracle),
            "firebird" | "fdb" => Ok(Dialect::Firebird),
            other => Err(QuarryError::connection(format!(
                "Unsupported database driver '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = QuarryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dialect> for String {
    fn from(value: Dialect) -> Self {
        value.name().to_string()
    }
}

/// Insert `clause` right after the leading `SELECT` keyword of `sql`.
pub(crate) fn after_select(sql: &str, clause: &str) -> String {
    let trimmed = sql.trim_start();
    match trimmed.get(..6) {
        Some(head) if head.eq_ignore_ascii_case("SELECT") => {
            let rest = &trimmed[6..];
            match rest.trim_start().get(..8) {
                Some(d) if d.eq_ignore_ascii_case("DISTINCT") => {
                    let rest = rest.trim_start();
                    format!("SELECT DISTINCT {clause}{}", &rest[8..])
                }
                _ => format!("SELECT {clause}{rest}"),
            }
        }
        _ => format!("{clause} {sql}"),
    }
}
