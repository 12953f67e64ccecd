//! # quarry
//!
//! A multi-dialect query builder and lightweight data-access layer.
//!
//! ## Features
//!
//! - **Four dialects**: MySQL, SQL Server, Oracle and Firebird, each with its own limit
//!   syntax, date functions, identifier quoting and table existence check
//! - **Fluent, validated builder**: arguments are checked when the method is called, and
//!   every value is bound as a parameter
//! - **Eager loading**: `with` / `with_one` resolve relations in one extra query each
//! - **Pagination and chunking** over the same query state
//! - **Result cache**: zstd-compressed JSON payloads with mtime-based expiry
//! - **Profiler**: per-call records with timings, speed buckets and reconstructed SQL
//! - **Named connections**: profiles registered up front, connected lazily
//!
//! quarry does not speak any wire protocol; a [`Connector`] supplied by the application
//! turns a [`ConnectionProfile`] into a live [`Connection`].
//!
//! ```ignore
//! use quarry::prelude::*;
//! use std::time::Duration;
//!
//! let db = Database::from_config(&DatabaseConfig::load("database.toml")?, connector)?;
//!
//! let page = db
//!     .table("orders")
//!     .await?
//!     .where_("status", "open")?
//!     .where_year("created_at", 2024)?
//!     .with("lines", "order_lines", "order_id", "id")?
//!     .order_by("created_at", "DESC")?
//!     .cache("open-orders-2024", Duration::from_secs(300))
//!     .paginate(1, 25, 1)
//!     .await?;
//! ```

pub mod builder;
pub mod cache;
pub mod client;
pub mod condition;
pub mod config;
pub mod database;
pub mod dialect;
pub mod eager;
pub mod error;
pub mod ident;
pub mod placeholder;
pub mod prelude;
pub mod profiler;
pub mod registry;
pub mod value;

mod executor;

pub use builder::{Columns, JoinKind, Page, Query, RelationKind, RelationQuery};
pub use cache::{
    CacheBlob, CacheDirective, CacheScope, CacheStore, Clock, FileCacheStore, ManualClock,
    MemoryCacheStore, ResultCache, SystemClock,
};
pub use client::{Connection, Connector, ExecOutcome};
pub use condition::{Connective, Operator};
pub use config::{CacheConfig, ConnectionProfile, DatabaseConfig, ProfilerConfig};
pub use database::{Database, DatabaseBuilder};
pub use dialect::{DatePart, Dialect, DialectAdapter};
pub use error::{QuarryError, QuarryResult};
pub use ident::Ident;
pub use profiler::{ProfileOutcome, ProfileRecord, Profiler, QueryType, SpeedBucket};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use value::{Params, Row, Value};
