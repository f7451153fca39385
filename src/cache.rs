//! Content-addressed memoization of loaded tables.
//!
//! Identical input bytes always produce the same [`LoadedTable`], so the cache
//! keys entries by the SHA-256 digest of the input and hands out shared
//! `Arc`s. The cache is `Sync` and can be used from every worker thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

use crate::csv_processor::{self, LoadedTable};
use crate::error::LoadError;

/// SHA-256 digest of an input file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        ContentHash(out)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Hit/miss counters of a [`TableCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct TableCache {
    entries: RwLock<HashMap<ContentHash, Arc<LoadedTable>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ContentHash) -> Option<Arc<LoadedTable>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Inserts a table unless one is already stored under `key`.
    ///
    /// Returns the stored entry, which is the earlier one if two threads race
    /// on the same content.
    pub fn insert(&self, key: ContentHash, table: LoadedTable) -> Arc<LoadedTable> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert_with(|| Arc::new(table)).clone()
    }

    /// Returns the cached table for `bytes`, parsing and inserting it on a miss.
    ///
    /// Load errors are returned to the caller and never cached.
    pub fn get_or_load(&self, bytes: &[u8]) -> Result<Arc<LoadedTable>, LoadError> {
        let key = ContentHash::of(bytes);
        if let Some(hit) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(hash = %key, "table cache hit");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let loaded = csv_processor::load(bytes)?;
        Ok(self.insert(key, loaded))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
