//! Eager loading of declared relations.
//!
//! After the parent rows are fetched, each relation runs one follow-up query:
//! `SELECT ... FROM related WHERE [customization AND] fk IN (...)`, with the distinct
//! non-null local-key values of the parents. More than [`IN_CHUNK_SIZE`] keys are split
//! into several sequential queries. Children are grouped by foreign key with loose key
//! equality (`5` matches `"5"`) and nested under the relation alias.

use crate::builder::{Relation, RelationKind};
use crate::condition::Connective;
use crate::dialect::Dialect;
use crate::error::QuarryResult;
use crate::executor::Executor;
use crate::value::{Row, Value};
use std::collections::{HashMap, HashSet};

/// Maximum number of keys bound into one `IN` list.
pub const IN_CHUNK_SIZE: usize = 1_000;

/// Resolve every relation against `rows`, nesting the results in place.
pub(crate) async fn resolve(
    exec: &Executor<'_>,
    dialect: Dialect,
    relations: &[Relation],
    rows: &mut [Row],
) -> QuarryResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    for relation in relations {
        resolve_one(exec, dialect, relation, rows).await?;
    }
    Ok(())
}

async fn resolve_one(
    exec: &Executor<'_>,
    dialect: Dialect,
    relation: &Relation,
    rows: &mut [Row],
) -> QuarryResult<()> {
    let local = relation.local_key.name();
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in rows.iter() {
        if let Some(value) = row.get_ignore_case(local)
            && let Some(key) = value.match_key()
            && seen.insert(key)
        {
            keys.push(value.clone());
        }
    }

    let mut children: HashMap<String, Vec<Row>> = HashMap::new();
    if !keys.is_empty() {
        let base = relation.related_state(dialect)?;
        let foreign = relation.foreign_key.name();
        let fk_sql = relation.foreign_key.to_sql(dialect);
        let scope = base.predicates.grouped();

        for (n, chunk) in keys.chunks(IN_CHUNK_SIZE).enumerate() {
            let mut state = base.clone();
            state.predicates = scope.clone();
            let marks = vec!["?"; chunk.len()].join(", ");
            state
                .predicates
                .push(Connective::And, format!("{fk_sql} IN ({marks})"), chunk.to_vec());
            if let Some(fields) = &state.fields
                && !projects_column(fields, foreign)
            {
                state.fields = Some(format!("{fields}, {fk_sql}"));
            }

            let identifier = format!("with:{}:{}", relation.alias, n + 1);
            let (sql, params) = state.render_select();
            for child in exec.query(&identifier, "with", &sql, &params).await? {
                if let Some(key) = child.get_ignore_case(foreign).and_then(Value::match_key) {
                    children.entry(key).or_default().push(child);
                }
            }
        }
        tracing::debug!(
            relation = %relation.alias,
            keys = keys.len(),
            children = children.values().map(Vec::len).sum::<usize>(),
            "relation resolved"
        );
    }

    for row in rows.iter_mut() {
        let matched = row
            .get_ignore_case(local)
            .and_then(Value::match_key)
            .and_then(|key| children.get(&key));
        let nested = match relation.kind {
            RelationKind::One => matched
                .and_then(|c| c.first())
                .cloned()
                .map_or(Value::Null, Value::Row),
            RelationKind::Many => Value::Rows(matched.cloned().unwrap_or_default()),
        };
        row.insert(relation.alias.clone(), nested);
    }
    Ok(())
}

/// Whether a projection list already yields `column` (bare, qualified, quoted or aliased).
fn projects_column(fields: &str, column: &str) -> bool {
    fields.split(',').any(|item| {
        let item = item.trim();
        if item == "*" || item.ends_with(".*") {
            return true;
        }
        let last = item.rsplit(char::is_whitespace).next().unwrap_or(item);
        let name = last.rsplit('.').next().unwrap_or(last);
        let name = name.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'));
        name.eq_ignore_ascii_case(column)
    })
}

#[cfg(test)]
mod tests {
    use super::projects_column;

    #[test]
    fn projection_detection() {
        assert!(projects_column("id, user_id", "user_id"));
        assert!(projects_column("p.id, `p`.`user_id`", "user_id"));
        assert!(projects_column("posts.owner AS user_id", "USER_ID"));
        assert!(projects_column("posts.*", "user_id"));
        assert!(!projects_column("id, title", "user_id"));
    }
}
