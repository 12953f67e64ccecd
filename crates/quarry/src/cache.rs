//! Read-through result cache.
//!
//! A terminal call marked with `cache(key, ttl)` first looks for a stored payload under
//! `<prefix><key>` (`get_`, `fetch_`, `count_`, `paginate_`). Payloads are the final,
//! post-eager-load result serialized as JSON and compressed with zstd. An entry expires
//! once `now - mtime > ttl`. Missing, expired and undecodable entries are all misses;
//! store failures are logged and never fail the call.

mod store;

#[cfg(test)]
mod tests;

pub use store::{
    CacheBlob, CacheStore, Clock, FileCacheStore, ManualClock, MemoryCacheStore, SystemClock,
};

use crate::config::CacheConfig;
use crate::error::{QuarryError, QuarryResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Terminal operation a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    Get,
    Fetch,
    Count,
    Paginate,
}

impl CacheScope {
    pub const ALL: [CacheScope; 4] = [
        CacheScope::Get,
        CacheScope::Fetch,
        CacheScope::Count,
        CacheScope::Paginate,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            CacheScope::Get => "get_",
            CacheScope::Fetch => "fetch_",
            CacheScope::Count => "count_",
            CacheScope::Paginate => "paginate_",
        }
    }

    /// Storage key for a caller key.
    pub fn key(self, key: &str) -> String {
        format!("{}{key}", self.prefix())
    }
}

/// A cache key and lifetime attached to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirective {
    pub key: String,
    pub ttl: Duration,
}

/// Compressed JSON cache over a [`CacheStore`].
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    level: i32,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            level: CacheConfig::default().compression_level,
        }
    }

    /// Build the cache described by `config` (file store when a directory is set).
    pub fn from_config(config: &CacheConfig) -> Self {
        let store: Arc<dyn CacheStore> = match &config.directory {
            Some(dir) => Arc::new(FileCacheStore::new(dir.clone())),
            None => Arc::new(MemoryCacheStore::new()),
        };
        Self::new(store).with_compression_level(config.compression_level)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Read and decode an entry, reporting store and decode failures.
    ///
    /// `key` is the full storage key. Expired entries read as `Ok(None)`.
    pub async fn read<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> QuarryResult<Option<T>> {
        let Some(blob) = self.store.get(key).await? else {
            return Ok(None);
        };
        let age = self
            .clock
            .now()
            .duration_since(blob.modified)
            .unwrap_or_default();
        if age > ttl {
            tracing::debug!(key, age_ms = age.as_millis() as u64, "cache entry expired");
            return Ok(None);
        }
        let json = zstd::decode_all(blob.bytes.as_slice())
            .map_err(|e| QuarryError::Serialization(format!("failed to decompress '{key}': {e}")))?;
        Ok(Some(serde_json::from_slice(&json)?))
    }

    /// Encode and store an entry, reporting failures.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> QuarryResult<()> {
        let json = serde_json::to_vec(value)?;
        let bytes = zstd::encode_all(json.as_slice(), self.level)
            .map_err(|e| QuarryError::Serialization(format!("failed to compress '{key}': {e}")))?;
        self.store.put(key, bytes, self.clock.now()).await
    }

    /// Lookup used by terminal operations: every failure is a logged miss.
    pub(crate) async fn lookup<T: DeserializeOwned>(
        &self,
        scope: CacheScope,
        directive: &CacheDirective,
    ) -> Option<T> {
        let key = scope.key(&directive.key);
        match self.read(&key, directive.ttl).await {
            Ok(Some(v)) => {
                tracing::debug!(key = %key, "cache hit");
                Some(v)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store used by terminal operations: failures are logged and dropped.
    pub(crate) async fn save<T: Serialize + ?Sized>(
        &self,
        scope: CacheScope,
        directive: &CacheDirective,
        value: &T,
    ) {
        let key = scope.key(&directive.key);
        if let Err(e) = self.write(&key, value).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    /// Remove every entry stored for a caller key.
    pub async fn forget(&self, key: &str) -> QuarryResult<()> {
        for scope in CacheScope::ALL {
            self.store.remove(&scope.key(key)).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
