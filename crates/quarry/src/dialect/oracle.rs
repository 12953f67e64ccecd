use super::{DatePart, DialectAdapter};
use crate::config::ConnectionProfile;
use crate::error::QuarryResult;

/// Oracle (OCI).
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleAdapter;

const ROW_NUMBER_ALIAS: &str = "quarry_rn__";

impl DialectAdapter for OracleAdapter {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn connection_string(&self, profile: &ConnectionProfile) -> QuarryResult<String> {
        Ok(format!(
            "//{}:{}/{}",
            profile.host.as_deref().unwrap_or("localhost"),
            profile.port.unwrap_or(1521),
            profile.database.as_deref().unwrap_or_default()
        ))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM user_tables WHERE table_name = UPPER(?)"
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
        match (limit, offset.filter(|o| *o > 0)) {
            (None, None) => sql.to_string(),
            (Some(l), None) => format!("SELECT * FROM ({sql}) WHERE ROWNUM <= {l}"),
            (Some(l), Some(o)) => format!(
                "SELECT * FROM (SELECT quarry_q__.*, ROWNUM AS {ROW_NUMBER_ALIAS} FROM ({sql}) quarry_q__ WHERE ROWNUM <= {}) WHERE {ROW_NUMBER_ALIAS} > {o}",
                o.saturating_add(l)
            ),
            (None, Some(o)) => format!(
                "SELECT * FROM (SELECT quarry_q__.*, ROWNUM AS {ROW_NUMBER_ALIAS} FROM ({sql}) quarry_q__) WHERE {ROW_NUMBER_ALIAS} > {o}"
            ),
        }
    }

    fn date_part(&self, part: DatePart, column: &str) -> String {
        match part {
            DatePart::Date => format!("TRUNC({column})"),
            DatePart::Month => format!("EXTRACT(MONTH FROM {column})"),
            DatePart::Day => format!("EXTRACT(DAY FROM {column})"),
            DatePart::Year => format!("EXTRACT(YEAR FROM {column})"),
        }
    }

    fn date_placeholder(&self) -> &'static str {
        "TO_DATE(?, 'YYYY-MM-DD')"
    }

    fn row_number_alias(&self) -> Option<&'static str> {
        Some(ROW_NUMBER_ALIAS)
    }
}
