//! SQL rendering for a [`QueryState`].

use super::state::QueryState;
use crate::error::{QuarryError, QuarryResult};
use crate::ident::Ident;
use crate::value::{Params, Row, Value};

/// Trim and HTML-escape `& < > " '`.
fn escape_html(s: &str) -> String {
    let s = s.trim();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

impl QueryState {
    /// Projection, expanding the default and `*` to `base.*` plus every joined table.
    fn projection(&self) -> String {
        match self.fields.as_deref() {
            Some(fields) if fields != "*" => fields.to_string(),
            _ => {
                let mut tables = vec![format!("{}.*", self.quote(&self.table))];
                for join in &self.joins {
                    tables.push(format!("{}.*", self.quote(&join.table)));
                }
                tables.join(", ")
            }
        }
    }

    /// `FROM`, joins and `WHERE`, shared by every statement over the base table.
    fn write_source(&self, sql: &mut String) {
        sql.push_str(" FROM ");
        sql.push_str(&self.quote(&self.table));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push_str(" JOIN ");
            sql.push_str(&self.quote(&join.table));
            sql.push_str(" ON ");
            sql.push_str(&self.quote(&join.foreign_key));
            sql.push_str(" = ");
            sql.push_str(&self.quote(&join.local_key));
        }
        self.write_where(sql);
    }

    fn write_where(&self, sql: &mut String) {
        if let Some(conditions) = self.predicates.render() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions);
        }
    }

    fn where_binds(&self) -> Vec<Value> {
        self.predicates.binds().cloned().collect()
    }

    /// Render the full `SELECT`, including limit syntax for the dialect.
    pub(crate) fn render_select(&self) -> (String, Params) {
        let mut sql = format!("SELECT {}", self.projection());
        self.write_source(&mut sql);

        if let Some(group_by) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        let sql = self
            .dialect
            .apply_limit(&sql, self.limit, self.offset, !self.order_by.is_empty());
        (sql, Params::Positional(self.where_binds()))
    }

    /// Render `SELECT COUNT(*) AS total`, ignoring ordering and limits.
    ///
    /// A grouped query counts groups through the dialect's derived-table wrapper.
    pub(crate) fn render_count(&self) -> (String, Params) {
        let sql = match &self.group_by {
            None => {
                let mut sql = String::from("SELECT COUNT(*) AS total");
                self.write_source(&mut sql);
                sql
            }
            Some(group_by) => {
                let mut inner = format!("SELECT {group_by}");
                self.write_source(&mut inner);
                inner.push_str(" GROUP BY ");
                inner.push_str(group_by);
                self.dialect.count_wrapper(&inner)
            }
        };
        (sql, Params::Positional(self.where_binds()))
    }

    /// Values of `row` as binds, escaped when secure input is on.
    fn assignment_binds(&self, row: &Row) -> Vec<Value> {
        row.iter()
            .map(|(_, v)| match v {
                Value::Text(s) if self.secure_input && !s.is_empty() => {
                    Value::Text(escape_html(s))
                }
                other => other.clone(),
            })
            .collect()
    }

    fn assignment_columns(&self, row: &Row, what: &str) -> QuarryResult<Vec<String>> {
        if row.is_empty() {
            return Err(QuarryError::invalid_argument(format!(
                "{what} requires at least one column"
            )));
        }
        row.columns()
            .map(|c| Ident::parse(c).map(|ident| self.quote(&ident)))
            .collect()
    }

    /// `INSERT INTO table (cols) VALUES (?, ...)`.
    ///
    /// Text values are escaped unless secure input was turned off.
    pub(crate) fn render_insert(&self, row: &Row) -> QuarryResult<(String, Params)> {
        let columns = self.assignment_columns(row, "Insert")?;
        let marks = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({marks})",
            self.quote(&self.table),
            columns.join(", ")
        );
        Ok((sql, Params::Positional(self.assignment_binds(row))))
    }

    /// `UPDATE table SET c = ?, ... WHERE ...`; SET binds precede predicate binds.
    pub(crate) fn render_update(&self, row: &Row) -> QuarryResult<(String, Params)> {
        if !self.joins.is_empty() {
            return Err(QuarryError::invalid_argument(
                "Update cannot be combined with joins",
            ));
        }
        if self.predicates.is_empty() {
            return Err(QuarryError::invalid_argument(
                "Update requires at least one where condition",
            ));
        }
        let columns = self.assignment_columns(row, "Update")?;
        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.quote(&self.table),
            assignments.join(", ")
        );
        self.write_where(&mut sql);

        let mut binds = self.assignment_binds(row);
        binds.extend(self.where_binds());
        Ok((sql, Params::Positional(binds)))
    }
}
