use super::{DatePart, DialectAdapter};
use crate::config::ConnectionProfile;
use crate::error::{QuarryError, QuarryResult};

/// MySQL / MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlAdapter;

/// Largest row count MySQL accepts; stands in for "no limit" when only an offset is set.
const MAX_ROWS: u64 = 18_446_744_073_709_551_615;

impl DialectAdapter for MySqlAdapter {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn connection_string(&self, profile: &ConnectionProfile) -> QuarryResult<String> {
        let host = match &profile.socket {
            Some(_) => "localhost",
            None => profile.host.as_deref().unwrap_or("localhost"),
        };
        let mut url = url::Url::parse(&format!("mysql://{host}"))
            .map_err(|e| QuarryError::connection(format!("Invalid mysql host '{host}': {e}")))?;

        if let Some(user) = &profile.username {
            url.set_username(user)
                .map_err(|_| QuarryError::connection("Invalid mysql username"))?;
        }
        if let Some(password) = &profile.password {
            url.set_password(Some(password))
                .map_err(|_| QuarryError::connection("Invalid mysql password"))?;
        }
        if profile.socket.is_none() {
            url.set_port(Some(profile.port.unwrap_or(3306)))
                .map_err(|_| QuarryError::connection("Invalid mysql port"))?;
        }
        if let Some(database) = &profile.database {
            url.set_path(database);
        }
        {
            let mut query = url.query_pairs_mut();
            if let Some(socket) = &profile.socket {
                query.append_pair("socket", socket);
            }
            query.append_pair("charset", &profile.charset);
        }
        Ok(url.to_string())
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ? LIMIT 1"
    }

    fn quote_ident(&self, part: &str) -> String {
        format!("`{}`", part.replace('`', "``"))
    }

    fn apply_limit(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: Option<u64>,
        _has_order: bool,
    ) -> String {
        match (limit, offset) {
            (Some(l), Some(o)) => format!("{sql} LIMIT {l} OFFSET {o}"),
            (Some(l), None) => format!("{sql} LIMIT {l}"),
            (None, Some(o)) => format!("{sql} LIMIT {MAX_ROWS} OFFSET {o}"),
            (None, None) => sql.to_string(),
        }
    }

    fn date_part(&self, part: DatePart, column: &str) -> String {
        match part {
            DatePart::Date => format!("DATE({column})"),
            DatePart::Month => format!("MONTH({column})"),
            DatePart::Day => format!("DAY({column})"),
            DatePart::Year => format!("YEAR({column})"),
        }
    }
}
