//! Safe SQL identifier handling and fragment guards.
//!
//! [`Ident`] represents a table or column name, optionally dotted (`users.id`). Parts are
//! validated against `[A-Za-z_][A-Za-z0-9_$]*` and quoted per dialect when rendered.
//!
//! The statement guard ([`guard_fragment`]) rejects values that carry a complete SQL verb
//! as a standalone token. It runs on column names, text predicate values and raw order
//! fragments before any statement is sent.
//!
//! # Example
//! ```ignore
//! use quarry::Ident;
//!
//! let c = Ident::parse("users.id")?;
//! assert_eq!(c.to_sql(quarry::Dialect::MySql), "`users`.`id`");
//! # Ok::<(), quarry::QuarryError>(())
//! ```

use crate::dialect::Dialect;
use crate::error::{QuarryError, QuarryResult};
use std::sync::OnceLock;

/// A SQL identifier (column or table name), possibly dotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<String>,
}

impl Ident {
    /// Parse a dotted identifier such as `table.column`.
    pub fn parse(s: &str) -> QuarryResult<Self> {
        if s.is_empty() {
            return Err(QuarryError::invalid_argument("Identifier cannot be empty"));
        }

        let mut parts = Vec::new();
        for segment in s.split('.') {
            validate_part(segment, s)?;
            parts.push(segment.to_string());
        }

        Ok(Self { parts })
    }

    /// The last part (the bare column or table name).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether the identifier carries a qualifier (`table.column`).
    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }

    /// Render the identifier quoted for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write_sql(dialect, &mut out);
        out
    }

    pub(crate) fn write_sql(&self, dialect: Dialect, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&dialect.quote_ident(part));
        }
    }
}

fn validate_part(part: &str, whole: &str) -> QuarryResult<()> {
    let mut chars = part.chars();
    match chars.next() {
        None => {
            return Err(QuarryError::invalid_argument(format!(
                "Empty identifier segment in '{whole}'"
            )));
        }
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(QuarryError::invalid_argument(format!(
                "Invalid identifier start character '{c}' in '{whole}'"
            )));
        }
    }
    if let Some(c) = chars.find(|c| !(*c == '_' || *c == '$' || c.is_ascii_alphanumeric())) {
        return Err(QuarryError::invalid_argument(format!(
            "Invalid character '{c}' in identifier '{whole}'"
        )));
    }
    Ok(())
}

fn forbidden_re() -> &'static regex::Regex {
    static FORBIDDEN_RE: OnceLock<regex::Regex> = OnceLock::new();
    FORBIDDEN_RE.get_or_init(|| {
        regex::Regex::new(
            r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE|REPLACE|GRANT|REVOKE|SHOW)\b",
        )
        .expect("invalid built-in statement guard regex")
    })
}

/// Returns `true` if `s` contains a full-statement keyword as a standalone token.
pub fn contains_statement_keyword(s: &str) -> bool {
    forbidden_re().is_match(s)
}

/// Reject `s` when it contains a full-statement keyword.
///
/// `what` names the offending input in the error message (`column`, `value`, ...).
pub fn guard_fragment(what: &str, s: &str) -> QuarryResult<()> {
    if let Some(m) = forbidden_re().find(s) {
        return Err(QuarryError::invalid_argument(format!(
            "Forbidden keyword '{}' in {what} '{s}'",
            m.as_str().to_uppercase()
        )));
    }
    Ok(())
}

/// Validate a comma-separated group-by list (`"a, b.c"`).
pub fn validate_group_by_list(s: &str) -> QuarryResult<()> {
    static GROUP_LIST_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = GROUP_LIST_RE.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z0-9._, ]+$").expect("invalid built-in group-by regex")
    });
    if !re.is_match(s) {
        return Err(QuarryError::invalid_argument(format!(
            "Invalid group by clause '{s}'"
        )));
    }
    Ok(())
}

/// Validate a single group-by column (`"b.c"`).
pub fn validate_group_by_item(s: &str) -> QuarryResult<()> {
    static GROUP_ITEM_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = GROUP_ITEM_RE.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z0-9._]+$").expect("invalid built-in group-by regex")
    });
    if !re.is_match(s) {
        return Err(QuarryError::invalid_argument(format!(
            "Invalid group by column '{s}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        let ident = Ident::parse("users").unwrap();
        assert_eq!(ident.to_sql(Dialect::MySql), "`users`");
        assert!(!ident.is_qualified());
    }

    #[test]
    fn ident_dotted_per_dialect() {
        let ident = Ident::parse("users.id").unwrap();
        assert_eq!(ident.to_sql(Dialect::MySql), "`users`.`id`");
        assert_eq!(ident.to_sql(Dialect::MsSql), "[users].[id]");
        assert_eq!(ident.to_sql(Dialect::Oracle), "users.id");
        assert_eq!(ident.name(), "id");
    }

    #[test]
    fn ident_with_dollar() {
        assert!(Ident::parse("my_var$1").is_ok());
    }

    #[test]
    fn ident_rejects_bad_input() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("1table").is_err());
        assert!(Ident::parse("my table").is_err());
        assert!(Ident::parse("schema..table").is_err());
        assert!(Ident::parse("schema.").is_err());
        assert!(Ident::parse("id`; --").is_err());
    }

    #[test]
    fn statement_keywords_are_whole_tokens() {
        assert!(contains_statement_keyword("1; DROP TABLE users"));
        assert!(contains_statement_keyword("select"));
        assert!(!contains_statement_keyword("selected_at"));
        assert!(!contains_statement_keyword("updated"));
        assert!(!contains_statement_keyword("showcase"));
    }

    #[test]
    fn guard_fragment_names_the_keyword() {
        let err = guard_fragment("value", "x' OR 1=1; delete from t").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn group_by_patterns() {
        assert!(validate_group_by_list("a, b.c").is_ok());
        assert!(validate_group_by_list("a; drop").is_err());
        assert!(validate_group_by_item("b.c").is_ok());
        assert!(validate_group_by_item("a, b").is_err());
    }
}
