//! Rule set caching
//!
//! LRU cache of parsed rule sets keyed by the absolute rule file path.
//! Thread-safe with parking_lot RwLock. Atomic counters for hit statistics.

use super::RuleSet;
use crate::log_cache_operation;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Rule set cache with LRU eviction
pub struct RuleSetCache {
    cache: RwLock<LruCache<PathBuf, Arc<RuleSet>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RuleSetCache {
    /// Create new rule set cache with capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached rule set, or load and insert it.
    ///
    /// A failed load is not cached: the next asset governed by the same rule
    /// file reports the error again.
    pub fn get_or_load<E>(
        &self,
        path: &Path,
        load: impl FnOnce() -> Result<RuleSet, E>,
    ) -> Result<Arc<RuleSet>, E> {
        if let Some(rule_set) = self.get(path) {
            return Ok(rule_set);
        }
        let rule_set = Arc::new(load()?);
        self.cache.write().put(path.to_path_buf(), rule_set.clone());
        Ok(rule_set)
    }

    /// Get rule set from cache
    pub fn get(&self, path: &Path) -> Option<Arc<RuleSet>> {
        let mut cache = self.cache.write();
        if let Some(rule_set) = cache.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log_cache_operation!(hit, path.display(), cache = "rules");
            Some(rule_set.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            log_cache_operation!(miss, path.display(), cache = "rules");
            None
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            size: cache.len(),
            capacity: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Clear cache
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
