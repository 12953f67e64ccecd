//! Placeholder detection and bind validation.
//!
//! Statements use either positional `?` placeholders or named `:name` placeholders, never
//! both. The scanner walks the SQL once, skipping string literals, quoted identifiers
//! (`"..."`, `` `...` ``, `[...]`) and comments, so a `?` or `:x` inside a literal is never
//! mistaken for a placeholder. `::` (a cast in some dialects) is not a placeholder either.

use crate::error::{QuarryError, QuarryResult};
use crate::value::Params;
use std::collections::BTreeSet;

/// Kind of a placeholder found in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    Positional,
    Named(String),
}

/// A placeholder and its byte span in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub start: usize,
    pub end: usize,
    pub kind: PlaceholderKind,
}

/// Placeholder style used by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// No placeholders at all.
    None,
    /// `?` placeholders.
    Positional,
    /// `:name` placeholders.
    Named,
    /// Both styles in one statement (always rejected).
    Mixed,
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    Bracket,
    LineComment,
    BlockComment(u32),
}

/// Find every placeholder in `sql`, in order of appearance.
pub fn scan(sql: &str) -> Vec<Placeholder> {
    tokenize(sql).0
}

/// Whether `sql` contains a `;` outside literals and comments.
pub fn has_statement_separator(sql: &str) -> bool {
    tokenize(sql).1
}

fn tokenize(sql: &str) -> (Vec<Placeholder>, bool) {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut separator = false;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backtick,
                b'[' => state = State::Bracket,
                b';' => separator = true,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => found.push(Placeholder {
                    start: idx,
                    end: idx + 1,
                    kind: PlaceholderKind::Positional,
                }),
                b':' if bytes.get(idx + 1) == Some(&b':') => {
                    idx += 1; // `::` cast
                }
                b':' if idx == 0 || bytes[idx - 1] != b':' => {
                    if let Some(end) = scan_name(bytes, idx + 1) {
                        found.push(Placeholder {
                            start: idx,
                            end,
                            kind: PlaceholderKind::Named(sql[idx + 1..end].to_string()),
                        });
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backtick => {
                if b == b'`' {
                    if bytes.get(idx + 1) == Some(&b'`') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracket => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    (found, separator)
}

fn scan_name(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    let mut idx = start + 1;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        idx += 1;
    }
    Some(idx)
}

/// Classify the placeholders of a scanned statement.
pub fn style_of(placeholders: &[Placeholder]) -> PlaceholderStyle {
    let positional = placeholders
        .iter()
        .any(|p| p.kind == PlaceholderKind::Positional);
    let named = placeholders
        .iter()
        .any(|p| matches!(p.kind, PlaceholderKind::Named(_)));
    match (positional, named) {
        (false, false) => PlaceholderStyle::None,
        (true, false) => PlaceholderStyle::Positional,
        (false, true) => PlaceholderStyle::Named,
        (true, true) => PlaceholderStyle::Mixed,
    }
}

/// Count positional placeholders in `sql`.
pub fn count_positional(sql: &str) -> usize {
    scan(sql)
        .iter()
        .filter(|p| p.kind == PlaceholderKind::Positional)
        .count()
}

/// Check that `params` fit the placeholders of `sql`.
///
/// - mixing `?` and `:name` is rejected
/// - positional binds must match the `?` count exactly
/// - named binds must cover every `:name` and contain no unused names
/// - binds without any placeholder are rejected
pub fn validate(sql: &str, params: &Params) -> QuarryResult<PlaceholderStyle> {
    let placeholders = scan(sql);
    let style = style_of(&placeholders);

    match (style, params) {
        (PlaceholderStyle::Mixed, _) => Err(QuarryError::malformed(
            "Statement mixes positional (?) and named (:name) placeholders",
        )),
        (PlaceholderStyle::None, params) if !params.is_empty() => Err(QuarryError::malformed(
            format!(
                "Statement has no placeholders but {} bind value(s) were given",
                params.len()
            ),
        )),
        (PlaceholderStyle::None, _) => Ok(style),
        (PlaceholderStyle::Positional, Params::Positional(values)) => {
            if values.len() != placeholders.len() {
                return Err(QuarryError::malformed(format!(
                    "Statement expects {} positional bind value(s), got {}",
                    placeholders.len(),
                    values.len()
                )));
            }
            Ok(style)
        }
        (PlaceholderStyle::Positional, Params::Named(_)) => Err(QuarryError::malformed(
            "Named bind values given for a statement with positional placeholders",
        )),
        (PlaceholderStyle::Named, Params::Positional(values)) => {
            if values.is_empty() {
                return Err(QuarryError::malformed(
                    "Statement has named placeholders but no bind values were given",
                ));
            }
            Err(QuarryError::malformed(
                "Positional bind values given for a statement with named placeholders",
            ))
        }
        (PlaceholderStyle::Named, Params::Named(values)) => {
            let expected: BTreeSet<&str> = placeholders
                .iter()
                .filter_map(|p| match &p.kind {
                    PlaceholderKind::Named(name) => Some(name.as_str()),
                    PlaceholderKind::Positional => None,
                })
                .collect();
            let given: BTreeSet<&str> = values.iter().map(|(k, _)| k.as_str()).collect();

            if let Some(missing) = expected.difference(&given).next() {
                return Err(QuarryError::malformed(format!(
                    "Missing bind value for placeholder ':{missing}'"
                )));
            }
            if let Some(extra) = given.difference(&expected).next() {
                return Err(QuarryError::malformed(format!(
                    "Bind value ':{extra}' has no matching placeholder"
                )));
            }
            Ok(style)
        }
    }
}

/// Substitute bind values into `sql` as literals.
///
/// For display only (profiler records, logs). Returns `None` when the binds do not line up
/// with the placeholders.
pub fn substitute(sql: &str, params: &Params) -> Option<String> {
    let placeholders = scan(sql);
    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut cursor = 0;
    let mut next_positional = 0;

    for p in &placeholders {
        out.push_str(&sql[cursor..p.start]);
        let value = match (&p.kind, params) {
            (PlaceholderKind::Positional, Params::Positional(values)) => {
                let v = values.get(next_positional)?;
                next_positional += 1;
                v
            }
            (PlaceholderKind::Named(name), params) => params.get_named(name)?,
            _ => return None,
        };
        out.push_str(&value.to_sql_literal());
        cursor = p.end;
    }
    out.push_str(&sql[cursor..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn scan_skips_literals_identifiers_and_comments() {
        let sql = "SELECT '?', \"a?\", `b?`, [c?] FROM t -- ?\n WHERE x = ? /* :y */";
        let found = scan(sql);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PlaceholderKind::Positional);
    }

    #[test]
    fn scan_named_and_casts() {
        let found = scan("SELECT a::text FROM t WHERE id = :id AND name = :name_2");
        let names: Vec<_> = found
            .iter()
            .map(|p| match &p.kind {
                PlaceholderKind::Named(n) => n.as_str(),
                PlaceholderKind::Positional => "?",
            })
            .collect();
        assert_eq!(names, vec!["id", "name_2"]);
    }

    #[test]
    fn time_literal_is_not_a_placeholder() {
        assert!(scan("SELECT * FROM t WHERE at = '12:30:00'").is_empty());
    }

    #[test]
    fn separators_outside_literals() {
        assert!(has_statement_separator("1 = 1; DROP TABLE t"));
        assert!(!has_statement_separator("name = 'a;b' -- ;"));
    }

    #[test]
    fn mixed_styles_are_malformed() {
        let err = validate("SELECT * FROM t WHERE a = ? AND b = :b", &Params::default())
            .unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn positional_count_must_match() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
        assert!(validate(sql, &Params::positional([1])).unwrap_err().is_malformed());
        assert_eq!(
            validate(sql, &Params::positional([1, 2])).unwrap(),
            PlaceholderStyle::Positional
        );
    }

    #[test]
    fn named_binds_must_cover_placeholders() {
        let sql = "SELECT * FROM t WHERE a = :a OR b = :a";
        assert!(validate(sql, &Params::named([("a", 1)])).is_ok());
        assert!(validate(sql, &Params::named([("b", 1)])).unwrap_err().is_malformed());
        assert!(validate(sql, &Params::named([("a", 1), ("c", 2)]))
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn binds_without_placeholders_are_malformed() {
        let err = validate("SELECT 1", &Params::positional([1])).unwrap_err();
        assert!(err.is_malformed());
        assert!(validate("SELECT 1", &Params::default()).is_ok());
    }

    #[test]
    fn substitute_renders_literals() {
        let full = substitute(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            &Params::positional([Value::from(1), Value::from("x'y")]),
        )
        .unwrap();
        assert_eq!(full, "SELECT * FROM t WHERE a = 1 AND b = 'x''y'");

        let named = substitute("SELECT :a, :a", &Params::named([("a", 2)])).unwrap();
        assert_eq!(named, "SELECT 2, 2");

        assert!(substitute("SELECT ?", &Params::default()).is_none());
    }
}
