use super::{CacheKey, SharedCache, TransactionalCache};
use crate::core::{Result, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Owns one `TransactionalCache` per shared cache touched by the current
/// unit of work, keyed by namespace id.
#[derive(Default)]
pub struct TransactionalCacheManager {
    transactional_caches: HashMap<String, TransactionalCache>,
}

impl TransactionalCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self, cache: &SharedCache) {
        self.transactional_cache(cache).clear();
    }

    pub fn get_object(&mut self, cache: &SharedCache, key: &CacheKey) -> Result<Option<Value>> {
        self.transactional_cache(cache).get(key)
    }

    pub fn put_object(&mut self, cache: &SharedCache, key: CacheKey, value: Value) {
        self.transactional_cache(cache).put(key, value);
    }

    /// Commit every touched cache. All of them are flushed even if one
    /// fails; the first failure is returned.
    pub fn commit(&mut self) -> Result<()> {
        debug!("Committing {} transactional caches", self.transactional_caches.len());
        let mut first_error = None;
        for tx in self.transactional_caches.values_mut() {
            if let Err(e) = tx.commit() {
                warn!("Commit of cache {} failed: {}", tx.id(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn rollback(&mut self) -> Result<()> {
        debug!("Rolling back {} transactional caches", self.transactional_caches.len());
        let mut first_error = None;
        for tx in self.transactional_caches.values_mut() {
            if let Err(e) = tx.rollback() {
                warn!("Rollback of cache {} failed: {}", tx.id(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of shared caches touched so far
    pub fn len(&self) -> usize {
        self.transactional_caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactional_caches.is_empty()
    }

    fn transactional_cache(&mut self, cache: &SharedCache) -> &mut TransactionalCache {
        self.transactional_caches
            .entry(cache.id().to_string())
            .or_insert_with(|| TransactionalCache::new(SharedCache::clone(cache)))
    }
}
