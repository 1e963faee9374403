//! Bounded in-process fast cache, the first tier of every cascade.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::error::TierError;
use crate::tier::Tier;

/// Least-recently-used cache guarded by a mutex.
pub struct FastCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, V>>,
}

impl<K, V> FastCache<K, V>
where
    K: Hash + Eq,
{
    /// Creates a cache holding at most `capacity` entries (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Drops the entry for `key`, returning whether one was present.
    #[must_use]
    pub fn evict(&self, key: &K) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.pop(key).is_some())
            .unwrap_or(false)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Tier<K, V> for FastCache<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn name(&self) -> &'static str {
        "fast-cache"
    }

    fn lookup(&self, key: &K) -> Result<Option<V>, TierError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TierError::Poisoned { tier: "fast-cache" })?;
        Ok(entries.get(key).cloned())
    }

    fn accepts_write_back(&self) -> bool {
        true
    }

    fn write_back(&self, key: &K, value: &V) -> Result<(), TierError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TierError::Poisoned { tier: "fast-cache" })?;
        entries.put(key.clone(), value.clone());
        Ok(())
    }
}
