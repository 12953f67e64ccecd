use crate::error::{QuarryError, QuarryResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// A stored blob and the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheBlob {
    pub bytes: Vec<u8>,
    pub modified: SystemTime,
}

/// Byte storage behind the result cache.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a blob; `Ok(None)` when absent.
    async fn get(&self, key: &str) -> QuarryResult<Option<CacheBlob>>;

    /// Write (or overwrite) a blob, stamping it with `modified`.
    async fn put(&self, key: &str, bytes: Vec<u8>, modified: SystemTime) -> QuarryResult<()>;

    /// Delete a blob. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> QuarryResult<()>;
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One `<key>.cache` file per entry under a directory.
///
/// `/` and `\` in keys become `-`. Writes go to a temporary file that is renamed into
/// place, so readers never observe a partial entry.
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.cache", key.replace(['/', '\\'], "-")))
    }
}

fn io_err(action: &str, path: &Path, e: std::io::Error) -> QuarryError {
    QuarryError::Serialization(format!("failed to {action} {}: {e}", path.display()))
}

#[async_trait::async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> QuarryResult<Option<CacheBlob>> {
        let path = self.path_for(key);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err("stat", &path, e)),
        };
        let modified = metadata
            .modified()
            .map_err(|e| io_err("read mtime of", &path, e))?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err("read", &path, e)),
        };
        Ok(Some(CacheBlob { bytes, modified }))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, modified: SystemTime) -> QuarryResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err("create", &self.dir, e))?;

        let path = self.path_for(key);
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("cache.tmp-{}-{n}", std::process::id()));

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_err("write", &tmp, e))?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&tmp)
            .await
            .map_err(|e| io_err("open", &tmp, e))?;
        file.into_std()
            .await
            .set_modified(modified)
            .map_err(|e| io_err("set mtime of", &tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err("rename", &path, e));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> QuarryResult<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err("remove", &path, e)),
        }
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheBlob>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> QuarryResult<Option<CacheBlob>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, modified: SystemTime) -> QuarryResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), CacheBlob { bytes, modified });
        Ok(())
    }

    async fn remove(&self, key: &str) -> QuarryResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
