//! WHERE clause primitives.
//!
//! [`Operator`] is the closed set of comparison operators accepted by `where_op`. A
//! [`PredicateList`] holds rendered fragments (with `?` placeholders) together with their
//! connectives and bind values, in the order they were added; rendering keeps that order
//! so placeholders and binds always line up.

use crate::error::{QuarryError, QuarryResult};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Comparison operator for a single-value predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `<>`
    NotEq,
    /// `!=`
    BangEq,
    /// `LIKE`
    Like,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::NotEq => "<>",
            Operator::BangEq => "!=",
            Operator::Like => "LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Lte),
            ">=" => Ok(Operator::Gte),
            "<>" => Ok(Operator::NotEq),
            "!=" => Ok(Operator::BangEq),
            op if op.eq_ignore_ascii_case("like") => Ok(Operator::Like),
            other => Err(QuarryError::invalid_argument(format!(
                "Invalid operator '{other}'"
            ))),
        }
    }
}

/// How a predicate joins the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// A rendered WHERE fragment and its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub connective: Connective,
    pub fragment: String,
    pub binds: Vec<Value>,
}

/// Ordered list of predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateList {
    items: Vec<Predicate>,
}

impl PredicateList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, connective: Connective, fragment: impl Into<String>, binds: Vec<Value>) {
        self.items.push(Predicate {
            connective,
            fragment: fragment.into(),
            binds,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.items.iter()
    }

    /// Condition text without the `WHERE` keyword; `None` when empty.
    ///
    /// The first predicate's connective is dropped.
    pub fn render(&self) -> Option<String> {
        let mut items = self.items.iter();
        let first = items.next()?;
        let mut out = first.fragment.clone();
        for p in items {
            out.push(' ');
            out.push_str(p.connective.as_sql());
            out.push(' ');
            out.push_str(&p.fragment);
        }
        Some(out)
    }

    /// Bind values in placeholder order.
    pub fn binds(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().flat_map(|p| p.binds.iter())
    }

    pub fn bind_count(&self) -> usize {
        self.items.iter().map(|p| p.binds.len()).sum()
    }

    /// Collapse the list into a single parenthesized `AND` predicate.
    ///
    /// Lets further predicates be appended without OR terms escaping their scope.
    pub fn grouped(&self) -> PredicateList {
        let mut out = PredicateList::new();
        if let Some(fragment) = self.render() {
            let fragment = if self.items.len() > 1 {
                format!("({fragment})")
            } else {
                fragment
            };
            out.push(Connective::And, fragment, self.binds().cloned().collect());
        }
        out
    }
}

fn date_re() -> &'static regex::Regex {
    static DATE_RE: OnceLock<regex::Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| {
        regex::Regex::new(r"^(\d{1,4})-(\d{2})-(\d{2})$").expect("invalid built-in date regex")
    })
}

fn time_re() -> &'static regex::Regex {
    static TIME_RE: OnceLock<regex::Regex> = OnceLock::new();
    TIME_RE.get_or_init(|| {
        regex::Regex::new(r"^(\d{2}):(\d{2}):(\d{2})$").expect("invalid built-in time regex")
    })
}

#[derive(Debug, PartialEq, PartialOrd)]
enum Bound {
    Number(f64),
    Date(u32, u32, u32),
    Time(u32, u32, u32),
    DateTime(NaiveDateTime),
}

impl Bound {
    fn kind(&self) -> &'static str {
        match self {
            Bound::Number(_) => "numeric",
            Bound::Date(..) => "date",
            Bound::Time(..) => "time",
            Bound::DateTime(_) => "datetime",
        }
    }
}

fn triple(caps: &regex::Captures<'_>) -> Option<(u32, u32, u32)> {
    Some((
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
        caps.get(3)?.as_str().parse().ok()?,
    ))
}

fn classify(v: &Value) -> Option<Bound> {
    use chrono::{Datelike, Timelike};
    match v {
        Value::Int(i) => Some(Bound::Number(*i as f64)),
        Value::Float(f) if f.is_finite() => Some(Bound::Number(*f)),
        Value::Date(d) => Some(Bound::Date(d.year().max(0) as u32, d.month(), d.day())),
        Value::Time(t) => Some(Bound::Time(t.hour(), t.minute(), t.second())),
        Value::DateTime(dt) => Some(Bound::DateTime(*dt)),
        Value::Text(s) => {
            let s = s.trim();
            if let Some((y, m, d)) = date_re().captures(s).as_ref().and_then(triple) {
                return Some(Bound::Date(y, m, d));
            }
            if let Some((h, m, sec)) = time_re().captures(s).as_ref().and_then(triple) {
                return Some(Bound::Time(h, m, sec));
            }
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Bound::Number)
        }
        _ => None,
    }
}

/// Validate the two bounds of a BETWEEN predicate.
///
/// Each bound must be numeric, a `YYYY-MM-DD` date (1 to 4 digit year), or an `HH:MM:SS`
/// time; both must be of the same kind and `start` must not exceed `end`.
pub fn validate_between(start: &Value, end: &Value) -> QuarryResult<()> {
    let (Some(a), Some(b)) = (classify(start), classify(end)) else {
        return Err(QuarryError::invalid_argument(format!(
            "Invalid between bounds '{start}' and '{end}': expected numbers, dates (YYYY-MM-DD) or times (HH:MM:SS)"
        )));
    };
    if a.kind() != b.kind() {
        return Err(QuarryError::invalid_argument(format!(
            "Between bounds must be of the same kind, got {} and {}",
            a.kind(),
            b.kind()
        )));
    }
    match a.partial_cmp(&b) {
        Some(Ordering::Less | Ordering::Equal) => Ok(()),
        _ => Err(QuarryError::invalid_argument(format!(
            "Between start '{start}' is greater than end '{end}'"
        ))),
    }
}

/// Normalize a calendar date argument to `YYYY-MM-DD`.
pub fn calendar_date(value: &Value) -> QuarryResult<String> {
    let parsed = match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    };
    parsed
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| QuarryError::invalid_argument(format!("Invalid date '{value}'")))
}

/// Validate an integer date component in `range`.
pub fn date_component(
    what: &str,
    value: &Value,
    range: std::ops::RangeInclusive<i64>,
) -> QuarryResult<i64> {
    value
        .as_int()
        .filter(|v| range.contains(v))
        .ok_or_else(|| {
            QuarryError::invalid_argument(format!(
                "Invalid {what} '{value}': expected {}..={}",
                range.start(),
                range.end()
            ))
        })
}
