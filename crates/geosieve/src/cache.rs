use crate::config::{CacheConfig, TierConfig};

use geosieve_core::{schema::DatasetId, stmt::RecordId, Fingerprint};

use lru::LruCache;
use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// The engine's three cache tiers.
///
/// Caching never changes a result: every tier can be disabled, and every
/// entry is dropped when a dataset it depends on changes.
#[derive(Debug)]
pub(crate) struct Cache {
    /// Filter AST to native predicate text
    pub(crate) expressions: Tier<Arc<str>>,

    /// Reference WKT to normalized WKT
    pub(crate) geometries: Tier<Arc<str>>,

    /// Filter request to its result
    pub(crate) queries: Tier<CachedResult>,
}

#[derive(Debug, Clone)]
pub(crate) struct CachedResult {
    pub(crate) ids: Arc<[RecordId]>,
    pub(crate) predicate: Arc<str>,
}

/// One LRU tier with a per-entry time to live.
pub(crate) struct Tier<V> {
    name: &'static str,

    /// `None` when the tier is disabled
    entries: Option<Mutex<LruCache<Fingerprint, Entry<V>>>>,

    ttl: Duration,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,

    /// Datasets whose change invalidates the entry
    datasets: Vec<DatasetId>,
}

impl Cache {
    pub(crate) fn new(config: &CacheConfig) -> Cache {
        Cache {
            expressions: Tier::new("expression", config.expressions),
            geometries: Tier::new("geometry", config.geometries),
            queries: Tier::new("query", config.queries),
        }
    }

    /// Drops every entry depending on `dataset`.
    pub(crate) fn invalidate(&self, dataset: &DatasetId) {
        let dropped = self.expressions.invalidate(dataset)
            + self.geometries.invalidate(dataset)
            + self.queries.invalidate(dataset);
        tracing::debug!(%dataset, dropped, "Invalidated cache entries");
    }

    pub(crate) fn clear(&self) {
        self.expressions.clear();
        self.geometries.clear();
        self.queries.clear();
    }
}

impl<V: Clone> Tier<V> {
    pub(crate) fn new(name: &'static str, config: TierConfig) -> Tier<V> {
        Tier {
            name,
            entries: NonZeroUsize::new(config.capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl: config.ttl,
        }
    }

    pub(crate) fn get(&self, key: &Fingerprint) -> Option<V> {
        let mut entries = self.lock()?;

        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.value.clone());
        }

        entries.pop(key);
        None
    }

    pub(crate) fn insert(&self, key: Fingerprint, value: V, datasets: Vec<DatasetId>) {
        if let Some(mut entries) = self.lock() {
            entries.put(
                key,
                Entry {
                    value,
                    inserted_at: Instant::now(),
                    datasets,
                },
            );
        }
    }

    /// Returns the cached value for `key`, computing and storing it on a
    /// miss. Errors are not cached.
    pub(crate) fn get_or_try_insert<E>(
        &self,
        key: Fingerprint,
        datasets: impl FnOnce() -> Vec<DatasetId>,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute()?;
        self.insert(key, value.clone(), datasets());
        Ok(value)
    }

    fn invalidate(&self, dataset: &DatasetId) -> usize {
        let Some(mut entries) = self.lock() else {
            return 0;
        };

        let stale: Vec<Fingerprint> = entries
            .iter()
            .filter(|(_, entry)| entry.datasets.contains(dataset))
            .map(|(key, _)| *key)
            .collect();

        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    fn clear(&self) {
        if let Some(mut entries) = self.lock() {
            entries.clear();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().map_or(0, |entries| entries.len())
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<Fingerprint, Entry<V>>>> {
        self.entries
            .as_ref()
            .map(|entries| entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<V> core::fmt::Debug for Tier<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tier")
            .field("name", &self.name)
            .field("enabled", &self.entries.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}
