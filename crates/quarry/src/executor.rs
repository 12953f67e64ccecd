//! Statement execution with bind validation, profiling and error logging.

use crate::client::ExecOutcome;
use crate::error::{QuarryError, QuarryResult};
use crate::placeholder;
use crate::profiler::{ProfileOutcome, ProfileSpan, Profiler, truncate_sql_bytes};
use crate::registry::ConnectionHandle;
use crate::value::{Params, Row};

/// Runs statements for one connection, attributing them to a builder method.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Executor<'a> {
    handle: &'a ConnectionHandle,
    profiler: &'a Profiler,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(handle: &'a ConnectionHandle, profiler: &'a Profiler) -> Self {
        Self { handle, profiler }
    }

    fn open_span(
        &self,
        identifier: &str,
        method: &str,
        sql: &str,
        params: &Params,
    ) -> QuarryResult<Option<ProfileSpan>> {
        placeholder::validate(sql, params)?;
        tracing::debug!(
            target: "quarry.sql",
            method,
            identifier,
            connection = %self.handle.name(),
            driver = %self.handle.dialect(),
            binds = params.len(),
            sql = %truncate_sql_bytes(sql, 200),
            "executing"
        );
        Ok(self.profiler.start(
            identifier,
            method,
            self.handle.name(),
            self.handle.dialect().name(),
            sql,
            params,
        ))
    }

    fn fail(&self, span: Option<ProfileSpan>, method: &str, sql: &str, err: QuarryError) -> QuarryError {
        let message = match err {
            QuarryError::Execution { message, .. } => message,
            other => other.to_string(),
        };
        tracing::error!(
            method,
            connection = %self.handle.name(),
            error = %message,
            sql = %truncate_sql_bytes(sql, 200),
            "error executing query"
        );
        if let Some(span) = span {
            self.profiler
                .finish(span, ProfileOutcome::error(message.clone()), 0, 0);
        }
        QuarryError::execution(method, message)
    }

    /// Run a query and return its rows.
    pub(crate) async fn query(
        &self,
        identifier: &str,
        method: &str,
        sql: &str,
        params: &Params,
    ) -> QuarryResult<Vec<Row>> {
        let span = self.open_span(identifier, method, sql, params)?;
        let mut rows = match self.handle.connection().query(sql, params).await {
            Ok(rows) => rows,
            Err(e) => return Err(self.fail(span, method, sql, e)),
        };

        if let Some(alias) = self.handle.dialect().row_number_alias() {
            for row in &mut rows {
                let helper: Vec<String> = row
                    .columns()
                    .filter(|c| c.eq_ignore_ascii_case(alias))
                    .map(str::to_string)
                    .collect();
                for column in helper {
                    row.remove(&column);
                }
            }
        }

        if let Some(span) = span {
            let payload = rows.iter().map(Row::approx_size).sum();
            self.profiler
                .finish(span, ProfileOutcome::Rows(rows.len()), rows.len(), payload);
        }
        Ok(rows)
    }

    /// Run a statement that does not return rows.
    pub(crate) async fn execute(
        &self,
        identifier: &str,
        method: &str,
        sql: &str,
        params: &Params,
    ) -> QuarryResult<ExecOutcome> {
        let span = self.open_span(identifier, method, sql, params)?;
        let outcome = match self.handle.connection().execute(sql, params).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(span, method, sql, e)),
        };
        if let Some(span) = span {
            self.profiler
                .finish(span, ProfileOutcome::Affected(outcome.affected), 0, 0);
        }
        Ok(outcome)
    }
}
