use super::state::QueryState;
use crate::dialect::Dialect;
use crate::error::{QuarryError, QuarryResult};
use crate::ident::Ident;
use std::fmt;
use std::sync::Arc;

/// Whether a relation nests one row or a list of rows under its alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    One,
    Many,
}

/// Closure customizing the related query.
pub type Customizer = Arc<dyn Fn(&mut RelationQuery) -> QuarryResult<()> + Send + Sync>;

/// A relation declared on a query, resolved after the parent rows are fetched.
#[derive(Clone)]
pub(crate) struct Relation {
    pub(crate) alias: String,
    pub(crate) table: Ident,
    /// Column of the related table holding the parent key.
    pub(crate) foreign_key: Ident,
    /// Column of the parent rows the foreign key points at.
    pub(crate) local_key: Ident,
    pub(crate) kind: RelationKind,
    pub(crate) customize: Option<Customizer>,
}

impl Relation {
    pub(crate) fn new(
        alias: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        kind: RelationKind,
        customize: Option<Customizer>,
    ) -> QuarryResult<Self> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(QuarryError::invalid_argument("Relation alias cannot be empty"));
        }
        Ok(Self {
            alias: alias.to_string(),
            table: Ident::parse(table)?,
            foreign_key: Ident::parse(foreign_key)?,
            local_key: Ident::parse(local_key)?,
            kind,
            customize,
        })
    }

    /// Base state of the related query, with the customization applied.
    pub(crate) fn related_state(&self, dialect: Dialect) -> QuarryResult<QueryState> {
        let mut query = RelationQuery {
            state: QueryState::new(dialect, self.table.clone()),
        };
        if let Some(customize) = &self.customize {
            customize(&mut query)?;
        }
        Ok(query.state)
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("alias", &self.alias)
            .field("table", &self.table)
            .field("foreign_key", &self.foreign_key)
            .field("local_key", &self.local_key)
            .field("kind", &self.kind)
            .field("customized", &self.customize.is_some())
            .finish()
    }
}

/// Restricted builder handed to relation customizers.
///
/// Supports projection, predicates, ordering and a limit. It has no terminal operations
/// and cannot declare further relations.
///
/// ```ignore
/// db.table("users").await?
///     .with_using("posts", "posts", "user_id", "id", |posts| {
///         posts.where_("published", true)?.order_by("created_at", "DESC")?;
///         Ok(())
///     })?
///     .get()
///     .await?;
/// ```
#[derive(Debug)]
pub struct RelationQuery {
    state: QueryState,
}

impl RelationQuery {
    /// The related table.
    pub fn table_name(&self) -> String {
        self.state.table.parts.join(".")
    }

    predicate_methods!(by_ref);
}
