use super::{DatePart, DialectAdapter, after_select};
use crate::config::ConnectionProfile;
use crate::error::QuarryResult;

/// Firebird.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirebirdAdapter;

impl DialectAdapter for FirebirdAdapter {
    fn name(&self) -> &'static str {
        "firebird"
    }

    fn connection_string(&self, profile: &ConnectionProfile) -> QuarryResult<String> {
        Ok(format!(
            "{}/{}:{}",
            profile.host.as_deref().unwrap_or("localhost"),
            profile.port.unwrap_or(3050),
            profile.database.as_deref().unwrap_or_default()
        ))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM RDB$RELATIONS WHERE TRIM(RDB$RELATION_NAME) = UPPER(?)"
    }

    fn quote_ident(&self, part: &str) -> String {
        part.to_string()
    }

    fn apply_limit(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: Option<u64>,
        _has_order: bool,
    ) -> String {
        let clause = match (limit, offset) {
            (None, None) => return sql.to_string(),
            (Some(l), Some(o)) => format!("FIRST {l} SKIP {o}"),
            (Some(l), None) => format!("FIRST {l}"),
            (None, Some(o)) => format!("SKIP {o}"),
        };
        after_select(sql, &clause)
    }

    fn date_part(&self, part: DatePart, column: &str) -> String {
        match part {
            DatePart::Date => format!("CAST({column} AS DATE)"),
            DatePart::Month => format!("EXTRACT(MONTH FROM {column})"),
            DatePart::Day => format!("EXTRACT(DAY FROM {column})"),
            DatePart::Year => format!("EXTRACT(YEAR FROM {column})"),
        }
    }

    fn date_placeholder(&self) -> &'static str {
        "CAST(? AS DATE)"
    }
}
