//! Bounded LRU cache of archive loaders
//!
//! Every removal path (capacity eviction, replacement, explicit removal,
//! invalidation, shutdown) tears the loader down before the call returns:
//! the entry leaves the map and its handle is closed under the same guard,
//! so no new request can reach a loader that is being closed.
//!
//! Teardown blocks on the loader's write lock while the cache guard is held.
//! With a handful of entries and quick closes that serialization is cheap,
//! but a request stuck inside a handle stalls every other cache operation
//! until it returns.

use crate::id::CacheKey;
use crate::loader::Loader;
use lru::LruCache;
use parking_lot::{Mutex, MutexGuard};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Number of archives kept open at once
pub const OPENED_ARCHIVES_CACHE_SIZE: usize = 4;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(OPENED_ARCHIVES_CACHE_SIZE) {
    Some(n) => n,
    None => panic!("cache size must be non-zero"),
};

type LoaderMap = LruCache<CacheKey, Arc<Loader>>;

/// Capacity-bounded map from container and mode to its loader
pub struct ArchiveCache {
    entries: Mutex<LoaderMap>,
}

impl ArchiveCache {
    /// Create a cache holding at most `capacity` loaders.
    ///
    /// A capacity of zero falls back to [`OPENED_ARCHIVES_CACHE_SIZE`].
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Take the cache guard for a sequence of operations
    pub fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            map: self.entries.lock(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Loader>> {
        self.lock().get(key)
    }

    pub fn put(&self, key: CacheKey, loader: Arc<Loader>) {
        self.lock().put(key, loader)
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.lock().remove(key)
    }

    /// Close and remove every loader, waiting for in-flight requests
    pub fn evict_all(&self) {
        self.lock().evict_all()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl Default for ArchiveCache {
    fn default() -> Self {
        Self::new(OPENED_ARCHIVES_CACHE_SIZE)
    }
}

impl Drop for ArchiveCache {
    fn drop(&mut self) {
        let map = self.entries.get_mut();
        while let Some((key, loader)) = map.pop_lru() {
            teardown(&key, &loader);
        }
    }
}

fn teardown(key: &CacheKey, loader: &Loader) {
    debug!("Evicting archive {}", key);
    loader.close();
}

/// Exclusive access to the cache map
pub struct CacheGuard<'a> {
    map: MutexGuard<'a, LoaderMap>,
}

impl CacheGuard<'_> {
    /// Look up a loader and mark it most recently used
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<Loader>> {
        self.map.get(key).cloned()
    }

    /// Look up a loader without touching recency
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<Loader>> {
        self.map.peek(key).cloned()
    }

    /// Insert a loader as most recently used.
    ///
    /// Tears down the least recently used loader when over capacity, or the
    /// previous loader under the same key.
    pub fn put(&mut self, key: CacheKey, loader: Arc<Loader>) {
        if let Some((old_key, old)) = self.map.push(key, Arc::clone(&loader)) {
            if !Arc::ptr_eq(&old, &loader) {
                teardown(&old_key, &old);
            }
        }
    }

    /// Remove and tear down the loader for `key`, if cached
    pub fn remove(&mut self, key: &CacheKey) -> bool {
        match self.map.pop(key) {
            Some(loader) => {
                teardown(key, &loader);
                true
            }
            None => false,
        }
    }

    /// Remove the loader for `key` only if it is the instance identified by `token`
    pub fn remove_if_current(&mut self, key: &CacheKey, token: Uuid) -> bool {
        let current = self.map.peek(key).is_some_and(|l| l.token() == token);
        current && self.remove(key)
    }

    pub fn evict_all(&mut self) {
        while let Some((key, loader)) = self.map.pop_lru() {
            teardown(&key, &loader);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
