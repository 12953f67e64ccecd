use super::relation::Relation;
use super::{Columns, JoinKind};
use crate::cache::CacheDirective;
use crate::condition::{self, Connective, Operator, PredicateList};
use crate::dialect::{DatePart, Dialect};
use crate::error::{QuarryError, QuarryResult};
use crate::ident::{self, Ident};
use crate::placeholder::{self, PlaceholderStyle};
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) table: Ident,
    pub(crate) foreign_key: Ident,
    pub(crate) local_key: Ident,
}

/// Accumulated configuration of one query.
///
/// Predicate fragments are rendered (quoted, dialect functions applied) as they are added,
/// so the bind list always matches the placeholder order of the final statement.
#[derive(Debug, Clone)]
pub(crate) struct QueryState {
    pub(crate) dialect: Dialect,
    pub(crate) table: Ident,
    pub(crate) fields: Option<String>,
    pub(crate) joins: Vec<Join>,
    pub(crate) predicates: PredicateList,
    pub(crate) group_by: Option<String>,
    pub(crate) order_by: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) relations: Vec<Relation>,
    pub(crate) cache: Option<CacheDirective>,
    /// HTML-escape text values written by insert and update.
    pub(crate) secure_input: bool,
}

fn guard_value(value: &Value) -> QuarryResult<()> {
    match value {
        Value::Text(s) => ident::guard_fragment("value", s),
        _ => Ok(()),
    }
}

fn parse_direction(direction: &str) -> Option<&'static str> {
    match direction.trim().to_ascii_uppercase().as_str() {
        "ASC" => Some("ASC"),
        "DESC" => Some("DESC"),
        _ => None,
    }
}

fn non_negative(what: &str, v: i64) -> QuarryResult<u64> {
    u64::try_from(v).map_err(|_| {
        QuarryError::invalid_argument(format!("{what} must be a non-negative integer, got {v}"))
    })
}

fn guard_raw(what: &str, fragment: &str) -> QuarryResult<()> {
    if fragment.trim().is_empty() {
        return Err(QuarryError::invalid_argument(format!("Empty {what}")));
    }
    if placeholder::has_statement_separator(fragment) {
        return Err(QuarryError::invalid_argument(format!(
            "Statement separator ';' is not allowed in {what} '{fragment}'"
        )));
    }
    Ok(())
}

impl QueryState {
    pub(crate) fn new(dialect: Dialect, table: Ident) -> Self {
        Self {
            dialect,
            table,
            fields: None,
            joins: Vec::new(),
            predicates: PredicateList::new(),
            group_by: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            relations: Vec::new(),
            cache: None,
            secure_input: true,
        }
    }

    pub(crate) fn quote(&self, ident: &Ident) -> String {
        ident.to_sql(self.dialect)
    }

    fn column(&self, column: &str) -> QuarryResult<String> {
        let column = column.trim();
        if column.is_empty() {
            return Err(QuarryError::invalid_argument("Column name cannot be empty"));
        }
        ident::guard_fragment("column", column)?;
        Ok(column.to_string())
    }

    // ==================== Projection ====================

    pub(crate) fn select(&mut self, fields: impl Into<Columns>) -> QuarryResult<()> {
        let fields = fields.into().normalize();
        if fields.is_empty() {
            return Err(QuarryError::invalid_argument("Select list cannot be empty"));
        }
        ident::guard_fragment("select list", &fields)?;
        if placeholder::has_statement_separator(&fields) {
            return Err(QuarryError::invalid_argument(format!(
                "Statement separator ';' is not allowed in select list '{fields}'"
            )));
        }
        self.fields = Some(fields);
        Ok(())
    }

    pub(crate) fn join(
        &mut self,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        kind: JoinKind,
    ) -> QuarryResult<()> {
        let table = Ident::parse(table)?;
        let qualify = |key: &str, owner: &Ident| -> QuarryResult<Ident> {
            let key = Ident::parse(key)?;
            if key.is_qualified() {
                Ok(key)
            } else {
                let mut parts = owner.parts.clone();
                parts.extend(key.parts);
                Ok(Ident { parts })
            }
        };
        let foreign_key = qualify(foreign_key, &table)?;
        let local_key = qualify(local_key, &self.table)?;
        self.joins.push(Join {
            kind,
            table,
            foreign_key,
            local_key,
        });
        Ok(())
    }

    // ==================== Predicates ====================

    fn push_compare(
        &mut self,
        connective: Connective,
        column: &str,
        operator: Operator,
        value: Value,
    ) -> QuarryResult<()> {
        let column = self.column(column)?;
        guard_value(&value)?;
        self.predicates
            .push(connective, format!("{column} {operator} ?"), vec![value]);
        Ok(())
    }

    pub(crate) fn where_(&mut self, column: &str, value: impl Into<Value>) -> QuarryResult<()> {
        self.push_compare(Connective::And, column, Operator::Eq, value.into())
    }

    pub(crate) fn or_where(&mut self, column: &str, value: impl Into<Value>) -> QuarryResult<()> {
        self.push_compare(Connective::Or, column, Operator::Eq, value.into())
    }

    pub(crate) fn where_op(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<()> {
        let operator = operator.parse()?;
        self.push_compare(Connective::And, column, operator, value.into())
    }

    pub(crate) fn or_where_op(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> QuarryResult<()> {
        let operator = operator.parse()?;
        self.push_compare(Connective::Or, column, operator, value.into())
    }

    fn push_all(
        &mut self,
        connective: Connective,
        operator: Operator,
        pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Value>)>,
    ) -> QuarryResult<()> {
        let pairs: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(c, v)| (c.as_ref().to_string(), v.into()))
            .collect();
        if pairs.is_empty() {
            return Err(QuarryError::invalid_argument(
                "Column/value list cannot be empty",
            ));
        }
        for (column, value) in pairs {
            self.push_compare(connective, &column, operator, value)?;
        }
        Ok(())
    }

    pub(crate) fn where_all(
        &mut self,
        pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Value>)>,
    ) -> QuarryResult<()> {
        self.push_all(Connective::And, Operator::Eq, pairs)
    }

    pub(crate) fn or_where_all(
        &mut self,
        pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Value>)>,
    ) -> QuarryResult<()> {
        self.push_all(Connective::Or, Operator::Eq, pairs)
    }

    pub(crate) fn where_all_op(
        &mut self,
        pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Value>)>,
        operator: &str,
    ) -> QuarryResult<()> {
        let operator = operator.parse()?;
        self.push_all(Connective::And, operator, pairs)
    }

    pub(crate) fn or_where_all_op(
        &mut self,
        pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Value>)>,
        operator: &str,
    ) -> QuarryResult<()> {
        let operator = operator.parse()?;
        self.push_all(Connective::Or, operator, pairs)
    }

    fn push_in(
        &mut self,
        connective: Connective,
        column: &str,
        values: Vec<Value>,
        negate: bool,
    ) -> QuarryResult<()> {
        let column = self.column(column)?;
        if values.is_empty() {
            return Err(QuarryError::invalid_argument(format!(
                "Value list for {}IN on '{column}' cannot be empty",
                if negate { "NOT " } else { "" }
            )));
        }
        for v in &values {
            guard_value(v)?;
        }
        let marks = vec!["?"; values.len()].join(", ");
        let op = if negate { "NOT IN" } else { "IN" };
        self.predicates
            .push(connective, format!("{column} {op} ({marks})"), values);
        Ok(())
    }

    pub(crate) fn where_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> QuarryResult<()> {
        let values = values.into_iter().map(Into::into).collect();
        self.push_in(Connective::And, column, values, false)
    }

    pub(crate) fn or_where_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> QuarryResult<()> {
        let values = values.into_iter().map(Into::into).collect();
        self.push_in(Connective::Or, column, values, false)
    }

    pub(crate) fn where_not_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> QuarryResult<()> {
        let values = values.into_iter().map(Into::into).collect();
        self.push_in(Connective::And, column, values, true)
    }

    pub(crate) fn or_where_not_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> QuarryResult<()> {
        let values = values.into_iter().map(Into::into).collect();
        self.push_in(Connective::Or, column, values, true)
    }

    fn push_between(
        &mut self,
        connective: Connective,
        column: &str,
        start: Value,
        end: Value,
        negate: bool,
    ) -> QuarryResult<()> {
        let column = self.column(column)?;
        condition::validate_between(&start, &end)?;
        let op = if negate { "NOT BETWEEN" } else { "BETWEEN" };
        self.predicates.push(
            connective,
            format!("({column} {op} ? AND ?)"),
            vec![start, end],
        );
        Ok(())
    }

    pub(crate) fn where_between(
        &mut self,
        column: &str,
        start: impl Into<Value>,
        end: impl Into<Value>,
    ) -> QuarryResult<()> {
        self.push_between(Connective::And, column, start.into(), end.into(), false)
    }

    pub(crate) fn or_where_between(
        &mut self,
        column: &str,
        start: impl Into<Value>,
        end: impl Into<Value>,
    ) -> QuarryResult<()> {
        self.push_between(Connective::Or, column, start.into(), end.into(), false)
    }

    pub(crate) fn where_not_between(
        &mut self,
        column: &str,
        start: impl Into<Value>,
        end: impl Into<Value>,
    ) -> QuarryResult<()> {
        self.push_between(Connective::And, column, start.into(), end.into(), true)
    }

    pub(crate) fn or_where_not_between(
        &mut self,
        column: &str,
        start: impl Into<Value>,
        end: impl Into<Value>,
    ) -> QuarryResult<()> {
        self.push_between(Connective::Or, column, start.into(), end.into(), true)
    }

    fn push_null(&mut self, connective: Connective, column: &str, negate: bool) -> QuarryResult<()> {
        let column = self.column(column)?;
        let op = if negate { "IS NOT NULL" } else { "IS NULL" };
        self.predicates
            .push(connective, format!("{column} {op}"), Vec::new());
        Ok(())
    }

    pub(crate) fn where_null(&mut self, column: &str) -> QuarryResult<()> {
        self.push_null(Connective::And, column, false)
    }

    pub(crate) fn or_where_null(&mut self, column: &str) -> QuarryResult<()> {
        self.push_null(Connective::Or, column, false)
    }

    pub(crate) fn where_not_null(&mut self, column: &str) -> QuarryResult<()> {
        self.push_null(Connective::And, column, true)
    }

    pub(crate) fn or_where_not_null(&mut self, column: &str) -> QuarryResult<()> {
        self.push_null(Connective::Or, column, true)
    }

    fn push_date_part(&mut self, column: &str, part: DatePart, value: Value) -> QuarryResult<()> {
        let column = self.column(column)?;
        let expr = self.dialect.date_part(part, &column);
        let (placeholder, bind) = match part {
            DatePart::Date => (
                self.dialect.date_placeholder(),
                Value::Text(condition::calendar_date(&value)?),
            ),
            DatePart::Month => ("?", Value::Int(condition::date_component("month", &value, 1..=12)?)),
            DatePart::Day => ("?", Value::Int(condition::date_component("day", &value, 1..=31)?)),
            DatePart::Year => (
                "?",
                Value::Int(condition::date_component("year", &value, 1000..=9999)?),
            ),
        };
        self.predicates
            .push(Connective::And, format!("{expr} = {placeholder}"), vec![bind]);
        Ok(())
    }

    pub(crate) fn where_date(&mut self, column: &str, date: impl Into<Value>) -> QuarryResult<()> {
        self.push_date_part(column, DatePart::Date, date.into())
    }

    pub(crate) fn where_month(&mut self, column: &str, month: impl Into<Value>) -> QuarryResult<()> {
        self.push_date_part(column, DatePart::Month, month.into())
    }

    pub(crate) fn where_day(&mut self, column: &str, day: impl Into<Value>) -> QuarryResult<()> {
        self.push_date_part(column, DatePart::Day, day.into())
    }

    pub(crate) fn where_year(&mut self, column: &str, year: impl Into<Value>) -> QuarryResult<()> {
        self.push_date_part(column, DatePart::Year, year.into())
    }

    fn push_raw(
        &mut self,
        connective: Connective,
        fragment: &str,
        binds: Vec<Value>,
    ) -> QuarryResult<()> {
        guard_raw("raw where fragment", fragment)?;
        let placeholders = placeholder::scan(fragment);
        if matches!(
            placeholder::style_of(&placeholders),
            PlaceholderStyle::Named | PlaceholderStyle::Mixed
        ) {
            return Err(QuarryError::malformed(format!(
                "Raw where fragment must use positional (?) placeholders: '{fragment}'"
            )));
        }
        if placeholders.len() != binds.len() {
            return Err(QuarryError::malformed(format!(
                "Raw where fragment has {} placeholder(s) but {} bind value(s) were given",
                placeholders.len(),
                binds.len()
            )));
        }
        self.predicates
            .push(connective, format!("({})", fragment.trim()), binds);
        Ok(())
    }

    pub(crate) fn where_raw(
        &mut self,
        fragment: &str,
        binds: impl IntoIterator<Item = impl Into<Value>>,
    ) -> QuarryResult<()> {
        let binds = binds.into_iter().map(Into::into).collect();
        self.push_raw(Connective::And, fragment, binds)
    }

    pub(crate) fn or_where_raw(
        &mut self,
        fragment: &str,
        binds: impl IntoIterator<Item = impl Into<Value>>,
    ) -> QuarryResult<()> {
        let binds = binds.into_iter().map(Into::into).collect();
        self.push_raw(Connective::Or, fragment, binds)
    }

    // ==================== Grouping / ordering / limits ====================

    pub(crate) fn group_by(&mut self, columns: impl Into<Columns>) -> QuarryResult<()> {
        let rendered = match columns.into() {
            Columns::Raw(s) => {
                ident::validate_group_by_list(&s)?;
                s.trim().to_string()
            }
            Columns::List(items) => {
                if items.is_empty() {
                    return Err(QuarryError::invalid_argument("Group by list cannot be empty"));
                }
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    ident::validate_group_by_item(item)?;
                    let quoted: Vec<String> = item
                        .split('.')
                        .map(|part| self.dialect.quote_ident(part))
                        .collect();
                    out.push(quoted.join("."));
                }
                out.join(", ")
            }
        };
        self.group_by = Some(rendered);
        Ok(())
    }

    pub(crate) fn order_by(&mut self, column: &str, direction: &str) -> QuarryResult<()> {
        let dir = parse_direction(direction).ok_or_else(|| {
            QuarryError::invalid_argument(format!(
                "Order direction must be \"ASC\" or \"DESC\", got '{direction}'"
            ))
        })?;
        let column = Ident::parse(column.trim())?;
        self.order_by.push(format!("{} {dir}", self.quote(&column)));
        Ok(())
    }

    pub(crate) fn order_by_many(
        &mut self,
        columns: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    ) -> QuarryResult<()> {
        let mut items = Vec::new();
        for (column, direction) in columns {
            let dir = parse_direction(direction.as_ref()).unwrap_or("DESC");
            let column = Ident::parse(column.as_ref().trim())?;
            items.push(format!("{} {dir}", self.quote(&column)));
        }
        if items.is_empty() {
            return Err(QuarryError::invalid_argument("Order by list cannot be empty"));
        }
        self.order_by.extend(items);
        Ok(())
    }

    pub(crate) fn order_by_raw(&mut self, fragment: &str) -> QuarryResult<()> {
        guard_raw("raw order fragment", fragment)?;
        ident::guard_fragment("raw order fragment", fragment)?;
        if !placeholder::scan(fragment).is_empty() {
            return Err(QuarryError::malformed(format!(
                "Raw order fragment cannot contain placeholders: '{fragment}'"
            )));
        }
        self.order_by.push(fragment.trim().to_string());
        Ok(())
    }

    pub(crate) fn limit(&mut self, limit: i64) -> QuarryResult<()> {
        self.limit = Some(non_negative("Limit", limit)?);
        Ok(())
    }

    pub(crate) fn offset(&mut self, offset: i64) -> QuarryResult<()> {
        self.offset = Some(non_negative("Offset", offset)?);
        Ok(())
    }

    // ==================== Relations ====================

    pub(crate) fn add_relation(&mut self, relation: Relation) -> QuarryResult<()> {
        if self.relations.iter().any(|r| r.alias == relation.alias) {
            return Err(QuarryError::invalid_argument(format!(
                "Relation alias '{}' is already declared",
                relation.alias
            )));
        }
        self.relations.push(relation);
        Ok(())
    }
}
