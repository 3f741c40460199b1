//! Response cache for GET requests
//!
//! A bounded LRU store keyed by request path. Entries carry their creation
//! time and are filtered by age at read time; a stale entry is a miss, not
//! an eviction, so it may linger until overwritten or evicted by capacity
//! pressure. Eviction order is owned by the underlying `lru` crate.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cached response body and its creation timestamp
#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    created: Instant,
}

/// Bounded key-value store for raw response bodies
///
/// Shared across cloned clients. The lock is never held across an await.
pub(crate) struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    default_ttl: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Create a cache with the given capacity and default time-to-live
    pub(crate) fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ResponseCache {
            entries: Mutex::new(LruCache::new(capacity)),
            default_ttl,
        }
    }

    /// Store a response body, or purge the entry when `value` is `None`
    /// (the sentinel written after deletes and other mutations)
    pub(crate) fn put(&self, key: &str, value: Option<String>) {
        let mut entries = self.lock();
        match value {
            Some(body) => {
                entries.put(
                    key.to_string(),
                    CacheEntry {
                        body,
                        created: Instant::now(),
                    },
                );
            }
            None => {
                entries.pop(key);
            }
        }
    }

    /// Return the cached body if present and younger than the effective
    /// time-to-live, else treat the lookup as a miss
    pub(crate) fn get(&self, key: &str, ttl_override: Option<Duration>) -> Option<String> {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.created.elapsed() <= ttl => Some(entry.body.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, CacheEntry>> {
        // A poisoned lock only means another thread panicked mid-access;
        // the map itself is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
