//! Terminal operations. Each consumes the [`Query`].

use super::Query;
use crate::cache::CacheScope;
use crate::client::ExecOutcome;
use crate::eager;
use crate::error::{QuarryError, QuarryResult};
use crate::executor::Executor;
use crate::profiler::MAIN_IDENTIFIER;
use crate::value::{Row, Value};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

/// One page of results, shaped for table widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub draw: i64,
    pub records_total: u64,
    pub records_filtered: u64,
    /// Offset of the first row of the page.
    pub from: u64,
    pub data: Vec<Row>,
    pub current_page: u64,
    pub next_page: Option<u64>,
    pub previous_page: Option<u64>,
    pub last_page: u64,
    /// Set when the requested page is past the last page.
    pub error: Option<String>,
}

fn positive(what: &str, v: i64) -> QuarryResult<u64> {
    match u64::try_from(v) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(QuarryError::invalid_argument(format!(
            "{what} must be at least 1, got {v}"
        ))),
    }
}

/// A row count as returned by the driver: an integer, an integral float (Oracle `NUMBER`)
/// or numeric text.
fn count_total(value: &Value) -> Option<u64> {
    match value {
        Value::Int(v) => u64::try_from(*v).ok(),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 && *f >= 0.0 => {
            Some(*f as u64)
        }
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| count_total(&Value::Float(s.parse().ok()?)))
        }
        _ => None,
    }
}

impl Query<'_> {
    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.handle, self.db.profiler())
    }

    async fn select_rows(&self, method: &str) -> QuarryResult<Vec<Row>> {
        let exec = self.executor();
        let (sql, params) = self.state.render_select();
        let mut rows = exec.query(MAIN_IDENTIFIER, method, &sql, &params).await?;
        eager::resolve(&exec, self.state.dialect, &self.state.relations, &mut rows).await?;
        Ok(rows)
    }

    async fn count_rows(&self, method: &str) -> QuarryResult<u64> {
        let (sql, params) = self.state.render_count();
        let rows = self
            .executor()
            .query(MAIN_IDENTIFIER, method, &sql, &params)
            .await?;
        let value = rows.first().and_then(|row| row.get_ignore_case("total"));
        value.and_then(count_total).ok_or_else(|| {
            let message = match value {
                Some(v) => format!("Count returned a non-numeric total '{v}'"),
                None => "Count returned no 'total' column".to_string(),
            };
            tracing::error!(method, error = %message, "error reading count");
            QuarryError::execution(method, message)
        })
    }

    /// Run the query and return every row, with relations resolved.
    pub async fn get(self) -> QuarryResult<Vec<Row>> {
        let cache = self.db.cache();
        if let Some(directive) = &self.state.cache
            && let Some(rows) = cache.lookup(CacheScope::Get, directive).await
        {
            return Ok(rows);
        }

        let rows = self.select_rows("get").await?;
        if let Some(directive) = &self.state.cache {
            cache.save(CacheScope::Get, directive, &rows).await;
        }
        Ok(rows)
    }

    /// Run the query with `LIMIT 1` and return the first row.
    pub async fn fetch(mut self) -> QuarryResult<Option<Row>> {
        let cache = self.db.cache();
        if let Some(directive) = &self.state.cache
            && let Some(rows) = cache.lookup::<Vec<Row>>(CacheScope::Fetch, directive).await
        {
            return Ok(rows.into_iter().next());
        }

        self.state.limit = Some(1);
        let mut rows = self.select_rows("fetch").await?;
        rows.truncate(1);
        if let Some(directive) = &self.state.cache {
            cache.save(CacheScope::Fetch, directive, &rows).await;
        }
        Ok(rows.into_iter().next())
    }

    /// Count matching rows (or groups, for a grouped query).
    pub async fn count(self) -> QuarryResult<u64> {
        let cache = self.db.cache();
        if let Some(directive) = &self.state.cache
            && let Some(total) = cache.lookup(CacheScope::Count, directive).await
        {
            return Ok(total);
        }

        let total = self.count_rows("count").await?;
        if let Some(directive) = &self.state.cache {
            cache.save(CacheScope::Count, directive, &total).await;
        }
        Ok(total)
    }

    /// Fetch page `page` (1-based) of `per_page` rows, plus totals.
    ///
    /// A page past the last page is not an error: it yields an empty `data` list and a
    /// message in [`Page::error`].
    pub async fn paginate(mut self, page: i64, per_page: i64, draw: i64) -> QuarryResult<Page> {
        let page = positive("Page", page)?;
        let per_page = positive("Per page", per_page)?;

        let cache = self.db.cache();
        if let Some(directive) = &self.state.cache
            && let Some(cached) = cache.lookup(CacheScope::Paginate, directive).await
        {
            return Ok(cached);
        }

        let total = self.count_rows("paginate").await?;
        let last_page = total.div_ceil(per_page).max(1);
        let from = (page - 1).saturating_mul(per_page);

        let mut result = Page {
            draw,
            records_total: total,
            records_filtered: total,
            from,
            data: Vec::new(),
            current_page: page,
            next_page: (page < last_page).then_some(page + 1),
            previous_page: (page > 1).then(|| page - 1),
            last_page,
            error: None,
        };

        if page > last_page {
            result.error = Some(format!(
                "Page {page} is beyond the last page ({last_page})"
            ));
        } else {
            self.state.limit = Some(per_page);
            self.state.offset = Some(from);
            result.data = self.select_rows("paginate").await?;
        }

        if let Some(directive) = &self.state.cache {
            cache.save(CacheScope::Paginate, directive, &result).await;
        }
        Ok(result)
    }

    /// Walk the result set in batches of `size` rows.
    ///
    /// `callback` runs once per non-empty batch; returning [`ControlFlow::Break`] stops the
    /// walk. A limit already set on the query caps the total number of rows visited.
    /// Returns the number of batches delivered. The result cache is not consulted.
    pub async fn chunk<F>(self, size: i64, mut callback: F) -> QuarryResult<usize>
    where
        F: FnMut(Vec<Row>) -> ControlFlow<()>,
    {
        let size = positive("Chunk size", size)?;
        let exec = self.executor();
        let start = self.state.offset.unwrap_or(0);
        let cap = self.state.limit;
        let mut visited = 0u64;
        let mut batches = 0usize;

        loop {
            let batch_size = match cap {
                Some(cap) if cap <= visited => break,
                Some(cap) => size.min(cap - visited),
                None => size,
            };
            let mut state = self.state.clone();
            state.limit = Some(batch_size);
            state.offset = Some(start + visited);

            let (sql, params) = state.render_select();
            let mut rows = exec.query(MAIN_IDENTIFIER, "chunk", &sql, &params).await?;
            if rows.is_empty() {
                break;
            }
            eager::resolve(&exec, state.dialect, &state.relations, &mut rows).await?;

            let fetched = rows.len() as u64;
            visited += fetched;
            batches += 1;
            if callback(rows).is_break() || fetched < batch_size {
                break;
            }
        }
        Ok(batches)
    }

    /// Insert one row into the base table.
    pub async fn insert(self, row: Row) -> QuarryResult<ExecOutcome> {
        let (sql, params) = self.state.render_insert(&row)?;
        self.executor()
            .execute(MAIN_IDENTIFIER, "insert", &sql, &params)
            .await
    }

    /// Update the rows matched by the predicates; at least one predicate is required.
    pub async fn update(self, row: Row) -> QuarryResult<ExecOutcome> {
        let (sql, params) = self.state.render_update(&row)?;
        self.executor()
            .execute(MAIN_IDENTIFIER, "update", &sql, &params)
            .await
    }
}
