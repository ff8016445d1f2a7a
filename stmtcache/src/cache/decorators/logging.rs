use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{Result, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Counts reads and hits; behavior of the chain is unchanged
pub struct LoggingCache {
    delegate: SharedCache,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl LoggingCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self {
            delegate,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    fn ratio(&self) -> f64 {
        let requests = self.requests();
        if requests == 0 {
            0.0
        } else {
            self.hits() as f64 / requests as f64
        }
    }
}

impl Cache for LoggingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let value = self.delegate.get(key)?;
        if value.as_ref().is_some_and(|v| !v.is_null()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Cache Hit Ratio [{}]: {}", self.id(), self.ratio());
        Ok(value)
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        Some(self.ratio())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use std::sync::Arc;

    #[test]
    fn test_hit_ratio() {
        let cache = LoggingCache::new(Arc::new(PerpetualCache::new("log")));
        let a = CacheKey::from_parts(["a"]);
        cache.put(a.clone(), Value::Int(1)).unwrap();

        cache.get(&a).unwrap();
        cache.get(&a).unwrap();
        cache.get(&a).unwrap();
        cache.get(&CacheKey::from_parts(["missing"])).unwrap();

        assert_eq!(cache.requests(), 4);
        assert_eq!(cache.hits(), 3);
        assert_eq!(cache.hit_ratio(), Some(0.75));
    }

    #[test]
    fn test_cached_null_is_not_a_hit() {
        let cache = LoggingCache::new(Arc::new(PerpetualCache::new("log")));
        let a = CacheKey::from_parts(["a"]);
        cache.put(a.clone(), Value::Null).unwrap();
        cache.get(&a).unwrap();

        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.hit_ratio(), Some(0.0));
    }
}
