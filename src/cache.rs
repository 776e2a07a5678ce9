//! Computation cache
//!
//! Expensive results are memoised under a string key. The on-disk variant
//! stores one file per key, named after the SHA-256 of the key, in a flat
//! directory. A fetch-only cache reads that same directory but never writes
//! to it; pool workers use one so the main thread is the only writer.

use crate::config::{format_file_size, CacheMode, Settings};
use crate::error::{Result, XrdError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const ENTRY_EXTENSION: &str = "bin";

/// Key/value store for computation results
#[derive(Debug)]
pub enum ComputationCache {
    /// Read/write cache on disk
    File { dir: PathBuf },
    /// Read-only view of an on-disk cache
    FetchOnly { dir: PathBuf },
    /// In-process cache
    Memory(Mutex<HashMap<String, Vec<u8>>>),
}

impl ComputationCache {
    /// Open a cache of the given mode rooted at `dir`
    ///
    /// `dir` is created for the read/write file cache and ignored in memory
    /// mode.
    pub fn open(mode: CacheMode, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        match mode {
            CacheMode::File => {
                std::fs::create_dir_all(&dir).map_err(|e| {
                    XrdError::Cache(format!("Failed to create cache dir {:?}: {}", dir, e))
                })?;
                Ok(ComputationCache::File { dir })
            }
            CacheMode::FileFetchOnly => Ok(ComputationCache::FetchOnly { dir }),
            CacheMode::Memory => Ok(ComputationCache::memory()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::open(settings.cache, &settings.cache_dir)
    }

    pub fn memory() -> Self {
        ComputationCache::Memory(Mutex::new(HashMap::new()))
    }

    pub fn mode(&self) -> CacheMode {
        match self {
            ComputationCache::File { .. } => CacheMode::File,
            ComputationCache::FetchOnly { .. } => CacheMode::FileFetchOnly,
            ComputationCache::Memory(_) => CacheMode::Memory,
        }
    }

    /// Directory of an on-disk cache
    pub fn dir(&self) -> Option<&Path> {
        match self {
            ComputationCache::File { dir } | ComputationCache::FetchOnly { dir } => Some(dir),
            ComputationCache::Memory(_) => None,
        }
    }

    fn entry_path(dir: &Path, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        dir.join(format!("{:x}.{}", hasher.finalize(), ENTRY_EXTENSION))
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            ComputationCache::File { dir } | ComputationCache::FetchOnly { dir } => {
                let path = Self::entry_path(dir, key);
                match std::fs::read(&path) {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(XrdError::Cache(format!(
                        "Failed to read cache entry {:?}: {}",
                        path, e
                    ))),
                }
            }
            ComputationCache::Memory(map) => Ok(lock(map)?.get(key).cloned()),
        }
    }

    /// Store a value; a no-op for fetch-only caches
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        match self {
            ComputationCache::File { dir } => {
                let path = Self::entry_path(dir, key);
                std::fs::write(&path, value).map_err(|e| {
                    XrdError::Cache(format!("Failed to write cache entry {:?}: {}", path, e))
                })
            }
            ComputationCache::FetchOnly { .. } => {
                tracing::trace!("Fetch-only cache, not storing '{}'", key);
                Ok(())
            }
            ComputationCache::Memory(map) => {
                lock(map)?.insert(key.to_string(), value.to_vec());
                Ok(())
            }
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, &bytes)
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        match self {
            ComputationCache::File { dir } => {
                let mut removed = 0usize;
                if dir.exists() {
                    for entry in std::fs::read_dir(dir)? {
                        let path = entry?.path();
                        if path.extension().is_some_and(|e| e == ENTRY_EXTENSION) {
                            std::fs::remove_file(&path)?;
                            removed += 1;
                        }
                    }
                }
                tracing::info!("Cleared {} cache entries from {:?}", removed, dir);
                Ok(())
            }
            ComputationCache::FetchOnly { dir } => Err(XrdError::Cache(format!(
                "Cannot clear fetch-only cache at {:?}",
                dir
            ))),
            ComputationCache::Memory(map) => {
                lock(map)?.clear();
                Ok(())
            }
        }
    }

    /// Size of the cache in bytes, counted until `limit` is exceeded
    ///
    /// The returned size is exact when it is at most `limit`, and a lower
    /// bound otherwise.
    pub fn size_at_least(&self, limit: u64) -> Result<u64> {
        match self {
            ComputationCache::File { dir } | ComputationCache::FetchOnly { dir } => {
                dir_size_at_least(dir, limit)
            }
            ComputationCache::Memory(map) => {
                Ok(lock(map)?.values().map(|v| v.len() as u64).sum())
            }
        }
    }

    /// Startup housekeeping for a read/write file cache
    ///
    /// Clears the cache when asked to, or when it has grown past
    /// `ceiling`; otherwise just logs its size. Other modes are left alone.
    pub fn housekeeping(&self, clear: bool, ceiling: u64) -> Result<()> {
        if self.mode() != CacheMode::File {
            return Ok(());
        }
        if clear {
            return self.clear();
        }
        let size = self.size_at_least(ceiling)?;
        tracing::info!("Cache size is (at least): {}", format_file_size(size));
        if size > ceiling {
            self.clear()?;
        }
        Ok(())
    }
}

fn lock(
    map: &Mutex<HashMap<String, Vec<u8>>>,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
    map.lock()
        .map_err(|_| XrdError::Cache("Memory cache lock poisoned".to_string()))
}

fn dir_size_at_least(dir: &Path, limit: u64) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut total = 0u64;
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else {
                total += metadata.len();
                if total > limit {
                    return Ok(total);
                }
            }
        }
    }
    Ok(total)
}
