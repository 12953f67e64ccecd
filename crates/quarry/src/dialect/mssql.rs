use super::{DatePart, DialectAdapter, after_select};
use crate::config::ConnectionProfile;
use crate::error::QuarryResult;

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlAdapter;

impl DialectAdapter for MsSqlAdapter {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn connection_string(&self, profile: &ConnectionProfile) -> QuarryResult<String> {
        let mut parts = vec![format!(
            "server=tcp:{},{}",
            profile.host.as_deref().unwrap_or("localhost"),
            profile.port.unwrap_or(1433)
        )];
        if let Some(database) = &profile.database {
            parts.push(format!("database={database}"));
        }
        if let Some(user) = &profile.username {
            parts.push(format!("user id={user}"));
        }
        if let Some(password) = &profile.password {
            parts.push(format!("password={}", escape_ado(password)));
        }
        Ok(parts.join(";"))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM sysobjects WHERE name = ? AND xtype = 'U'"
    }

    fn quote_ident(&self, part: &str) -> String {
        format!("[{}]", part.replace(']', "]]"))
    }

    fn apply_limit(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order: bool,
    ) -> String {
        match (limit, offset) {
            (None, None) => sql.to_string(),
            (Some(l), None) => after_select(sql, &format!("TOP ({l})")),
            (limit, Some(o)) => {
                let mut out = sql.to_string();
                if !has_order {
                    out.push_str(" ORDER BY (SELECT NULL)");
                }
                out.push_str(&format!(" OFFSET {o} ROWS"));
                if let Some(l) = limit {
                    out.push_str(&format!(" FETCH NEXT {l} ROWS ONLY"));
                }
                out
            }
        }
    }

    fn date_part(&self, part: DatePart, column: &str) -> String {
        match part {
            DatePart::Date => format!("CAST({column} AS DATE)"),
            DatePart::Month => format!("MONTH({column})"),
            DatePart::Day => format!("DAY({column})"),
            DatePart::Year => format!("YEAR({column})"),
        }
    }
}

/// Values containing `;` must be wrapped in braces in an ADO connection string.
fn escape_ado(value: &str) -> String {
    if value.contains(';') || value.starts_with('{') {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}
