//! Database facade: connections, profiler and result cache behind one entry point.
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! let db = Database::builder(connector)
//!     .connection("default", ConnectionProfile::new(Dialect::MySql)
//!         .with_host("127.0.0.1")
//!         .with_database("app"))
//!     .profiler(ProfilerConfig::new().enable_profiling())
//!     .build()?;
//!
//! let user = db.table("users").await?.where_("id", 7)?.fetch().await?;
//! ```

use crate::builder::{Query, QueryState};
use crate::cache::ResultCache;
use crate::client::{Connector, ExecOutcome};
use crate::config::{CacheConfig, ConnectionProfile, DEFAULT_CONNECTION, DatabaseConfig, ProfilerConfig};
use crate::error::{QuarryError, QuarryResult};
use crate::executor::Executor;
use crate::ident::Ident;
use crate::profiler::{MAIN_IDENTIFIER, Profiler};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::value::{Params, Row};
use std::sync::{Arc, PoisonError, RwLock};

static INSTANCE: RwLock<Option<Arc<Database>>> = RwLock::new(None);

/// Entry point for building and running queries.
#[derive(Debug)]
pub struct Database {
    registry: ConnectionRegistry,
    profiler: Profiler,
    cache: ResultCache,
}

impl Database {
    pub fn builder(connector: Arc<dyn Connector>) -> DatabaseBuilder {
        DatabaseBuilder::new(connector)
    }

    /// Build a database from a loaded config file.
    pub fn from_config(
        config: &DatabaseConfig,
        connector: Arc<dyn Connector>,
    ) -> QuarryResult<Arc<Self>> {
        Self::builder(connector).config(config).build()
    }

    /// The most recently built database, if any.
    pub fn instance() -> Option<Arc<Database>> {
        INSTANCE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Start a query on `name` of the active connection.
    ///
    /// The table name is validated and checked against the database; a missing table fails
    /// with [`QuarryError::UnknownTable`].
    pub async fn table(&self, name: &str) -> QuarryResult<Query<'_>> {
        let ident = Ident::parse(name.trim())?;
        let handle = self.registry.active().await?;
        let dialect = handle.dialect();

        let rows = Executor::new(&handle, &self.profiler)
            .query(
                MAIN_IDENTIFIER,
                "table",
                dialect.table_exists_sql(),
                &Params::positional([ident.name()]),
            )
            .await?;
        if rows.is_empty() {
            return Err(QuarryError::UnknownTable(name.to_string()));
        }

        Ok(Query::new(self, handle, QueryState::new(dialect, ident)))
    }

    /// Make `name` the active connection for subsequent [`table`](Self::table) calls.
    pub fn connection(&self, name: &str) -> QuarryResult<&Self> {
        self.registry.set_active(name)?;
        Ok(self)
    }

    /// Name of the active connection.
    pub fn active_connection(&self) -> String {
        self.registry.active_name()
    }

    /// Register a connection profile without connecting.
    pub async fn add_connection(
        &self,
        name: impl Into<String>,
        profile: ConnectionProfile,
    ) -> QuarryResult<()> {
        self.registry.add_connection(name, profile).await
    }

    /// Open the handle for `name` now instead of on first use.
    pub async fn connect(&self, name: &str) -> QuarryResult<ConnectionHandle> {
        self.registry.connect(name).await
    }

    /// Close the handle for `name`, optionally forgetting its profile.
    pub async fn disconnect(&self, name: &str, remove: bool) -> QuarryResult<()> {
        self.registry.disconnect(name, remove).await
    }

    // ==================== Transactions ====================

    async fn transaction_step(&self, method: &str) -> QuarryResult<()> {
        let handle = self.registry.active().await?;
        let connection = handle.connection();
        let result = match method {
            "begin_transaction" => connection.begin().await,
            "commit" => connection.commit().await,
            _ => connection.rollback().await,
        };
        result.map_err(|e| {
            let message = match e {
                QuarryError::Execution { message, .. } => message,
                other => other.to_string(),
            };
            tracing::error!(method, connection = %handle.name(), error = %message, "transaction failed");
            QuarryError::execution(method, message)
        })?;
        tracing::debug!(method, connection = %handle.name(), "transaction");
        Ok(())
    }

    /// Begin a transaction on the active connection.
    pub async fn begin_transaction(&self) -> QuarryResult<()> {
        self.transaction_step("begin_transaction").await
    }

    /// Commit the transaction on the active connection.
    pub async fn commit(&self) -> QuarryResult<()> {
        self.transaction_step("commit").await
    }

    /// Roll back the transaction on the active connection.
    pub async fn rollback(&self) -> QuarryResult<()> {
        self.transaction_step("rollback").await
    }

    // ==================== Raw statements ====================

    /// Run caller SQL with `?` or `:name` placeholders on the active connection.
    pub async fn raw_query(&self, sql: &str, params: impl Into<Params>) -> QuarryResult<Vec<Row>> {
        let handle = self.registry.active().await?;
        Executor::new(&handle, &self.profiler)
            .query(MAIN_IDENTIFIER, "raw_query", sql, &params.into())
            .await
    }

    /// [`raw_query`](Self::raw_query), returning the first row.
    pub async fn raw_fetch(&self, sql: &str, params: impl Into<Params>) -> QuarryResult<Option<Row>> {
        let handle = self.registry.active().await?;
        let rows = Executor::new(&handle, &self.profiler)
            .query(MAIN_IDENTIFIER, "raw_fetch", sql, &params.into())
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Run a caller statement that returns no rows.
    pub async fn raw_execute(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> QuarryResult<ExecOutcome> {
        let handle = self.registry.active().await?;
        Executor::new(&handle, &self.profiler)
            .execute(MAIN_IDENTIFIER, "raw_execute", sql, &params.into())
            .await
    }
}

/// Builder for [`Database`].
pub struct DatabaseBuilder {
    connector: Arc<dyn Connector>,
    connections: Vec<(String, ConnectionProfile)>,
    default: String,
    profiler: ProfilerConfig,
    cache: Option<ResultCache>,
    cache_config: CacheConfig,
}

impl DatabaseBuilder {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: Vec::new(),
            default: DEFAULT_CONNECTION.to_string(),
            profiler: ProfilerConfig::default(),
            cache: None,
            cache_config: CacheConfig::default(),
        }
    }

    /// Register a connection profile.
    pub fn connection(mut self, name: impl Into<String>, profile: ConnectionProfile) -> Self {
        self.connections.push((name.into(), profile));
        self
    }

    /// Connection active after [`build`](Self::build). Defaults to `"default"`.
    pub fn default_connection(mut self, name: impl Into<String>) -> Self {
        self.default = name.into();
        self
    }

    pub fn profiler(mut self, config: ProfilerConfig) -> Self {
        self.profiler = config;
        self
    }

    /// Use a ready-made result cache (custom store or clock).
    pub fn cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Take connections, default name, profiler and cache settings from a config file.
    pub fn config(mut self, config: &DatabaseConfig) -> Self {
        self.connections.extend(config.profiles());
        self.default = config.default.clone();
        self.profiler = config.profiler_config();
        self.cache_config = config.cache_config();
        self
    }

    /// Build the database and make it the process-wide [`Database::instance`].
    pub fn build(self) -> QuarryResult<Arc<Database>> {
        let registry = ConnectionRegistry::new(self.connector);
        for (name, profile) in self.connections {
            registry.insert_profile(name, profile);
        }
        if registry.contains(&self.default) {
            registry.set_active(&self.default)?;
        } else if self.default != DEFAULT_CONNECTION {
            return Err(QuarryError::UnknownConnection(self.default));
        }

        let cache = self
            .cache
            .unwrap_or_else(|| ResultCache::from_config(&self.cache_config));
        let db = Arc::new(Database {
            registry,
            profiler: Profiler::new(self.profiler),
            cache,
        });

        *INSTANCE.write().unwrap_or_else(PoisonError::into_inner) = Some(db.clone());
        tracing::debug!(connections = ?db.registry.names(), "database ready");
        Ok(db)
    }
}

impl std::fmt::Debug for DatabaseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseBuilder")
            .field("connections", &self.connections.len())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
