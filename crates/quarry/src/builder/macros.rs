/// Generate fluent methods that forward to the same-named `QueryState` mutator.
///
/// `owned` methods take and return the builder (`Query`); `by_ref` methods borrow it
/// (`RelationQuery`, configured inside a closure).
///
/// Usage:
/// ```ignore
/// impl Query<'_> {
///     fluent_methods! { owned:
///         fn limit(limit: i64);
///     }
/// }
/// ```
macro_rules! fluent_methods {
    (owned: $( $(#[$meta:meta])* fn $name:ident ( $($arg:ident : $ty:ty),* ); )*) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, $($arg: $ty),*) -> $crate::error::QuarryResult<Self> {
                self.state.$name($($arg),*)?;
                Ok(self)
            }
        )*
    };
    (by_ref: $( $(#[$meta:meta])* fn $name:ident ( $($arg:ident : $ty:ty),* ); )*) => {
        $(
            $(#[$meta])*
            pub fn $name(&mut self, $($arg: $ty),*) -> $crate::error::QuarryResult<&mut Self> {
                self.state.$name($($arg),*)?;
                Ok(self)
            }
        )*
    };
}

/// Projection, predicate, ordering and limit methods shared by `Query` and `RelationQuery`.
macro_rules! predicate_methods {
    ($mode:ident) => {
        fluent_methods! { $mode:
            /// Set the projection (a column string or an ordered list of columns).
            fn select(fields: impl Into<$crate::builder::Columns>);

            /// `AND column = value`.
            fn where_(column: &str, value: impl Into<$crate::value::Value>);
            /// `OR column = value`.
            fn or_where(column: &str, value: impl Into<$crate::value::Value>);
            /// `AND column <op> value` with one of `= < > <= >= <> != LIKE`.
            fn where_op(column: &str, operator: &str, value: impl Into<$crate::value::Value>);
            fn or_where_op(column: &str, operator: &str, value: impl Into<$crate::value::Value>);
            /// `AND` one equality per (column, value) pair, in order.
            fn where_all(
                pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<$crate::value::Value>)>
            );
            /// `OR` one equality per (column, value) pair, in order.
            fn or_where_all(
                pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<$crate::value::Value>)>
            );
            /// `AND` one `column <op> value` per pair, all with the same operator.
            fn where_all_op(
                pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<$crate::value::Value>)>,
                operator: &str
            );
            /// `OR` one `column <op> value` per pair, all with the same operator.
            fn or_where_all_op(
                pairs: impl IntoIterator<Item = (impl AsRef<str>, impl Into<$crate::value::Value>)>,
                operator: &str
            );

            /// `column IN (...)`; the list must not be empty.
            fn where_in(column: &str, values: impl IntoIterator<Item = impl Into<$crate::value::Value>>);
            fn or_where_in(column: &str, values: impl IntoIterator<Item = impl Into<$crate::value::Value>>);
            fn where_not_in(column: &str, values: impl IntoIterator<Item = impl Into<$crate::value::Value>>);
            fn or_where_not_in(column: &str, values: impl IntoIterator<Item = impl Into<$crate::value::Value>>);

            /// `(column BETWEEN start AND end)`.
            ///
            /// Both bounds must be numbers, `YYYY-MM-DD` dates or `HH:MM:SS` times of the same
            /// kind, with `start <= end`.
            fn where_between(
                column: &str,
                start: impl Into<$crate::value::Value>,
                end: impl Into<$crate::value::Value>
            );
            fn or_where_between(
                column: &str,
                start: impl Into<$crate::value::Value>,
                end: impl Into<$crate::value::Value>
            );
            fn where_not_between(
                column: &str,
                start: impl Into<$crate::value::Value>,
                end: impl Into<$crate::value::Value>
            );
            fn or_where_not_between(
                column: &str,
                start: impl Into<$crate::value::Value>,
                end: impl Into<$crate::value::Value>
            );

            fn where_null(column: &str);
            fn or_where_null(column: &str);
            fn where_not_null(column: &str);
            fn or_where_not_null(column: &str);

            /// Match the calendar date of a date/datetime column.
            fn where_date(column: &str, date: impl Into<$crate::value::Value>);
            /// Match the month (1-12) of a date column.
            fn where_month(column: &str, month: impl Into<$crate::value::Value>);
            /// Match the day of month (1-31) of a date column.
            fn where_day(column: &str, day: impl Into<$crate::value::Value>);
            /// Match the four-digit year of a date column.
            fn where_year(column: &str, year: impl Into<$crate::value::Value>);

            /// Append a raw boolean fragment with positional `?` binds, wrapped in parentheses.
            ///
            /// The fragment may not contain a statement separator and its placeholder count
            /// must equal the number of binds.
            fn where_raw(fragment: &str, binds: impl IntoIterator<Item = impl Into<$crate::value::Value>>);
            fn or_where_raw(fragment: &str, binds: impl IntoIterator<Item = impl Into<$crate::value::Value>>);

            /// Append `column ASC|DESC`; any other direction is rejected.
            fn order_by(column: &str, direction: &str);
            /// Append several orderings; unrecognized directions become `DESC`.
            fn order_by_many(columns: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>);
            /// Append a raw ordering expression (no placeholders, no statements).
            fn order_by_raw(fragment: &str);

            /// Limit the number of rows; negative values are rejected.
            fn limit(limit: i64);
        }
    };
}
