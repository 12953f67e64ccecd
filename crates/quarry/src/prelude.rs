//! Convenient imports for typical `quarry` usage.
//!
//! ```ignore
//! use quarry::prelude::*;
//! ```

pub use crate::row;
pub use crate::{
    CacheConfig, Columns, Connection, ConnectionProfile, Connector, Database, DatabaseConfig,
    Dialect, ExecOutcome, JoinKind, Page, Params, ProfilerConfig, QuarryError, QuarryResult,
    Query, Row, Value,
};
