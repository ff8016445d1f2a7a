use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{Result, Value};
use parking_lot::Mutex;

/// Serializes every operation on the wrapped chain behind one mutex
pub struct SynchronizedCache {
    delegate: SharedCache,
    guard: Mutex<()>,
}

impl SynchronizedCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self {
            delegate,
            guard: Mutex::new(()),
        }
    }
}

impl Cache for SynchronizedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        let _guard = self.guard.lock();
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let _guard = self.guard.lock();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let _guard = self.guard.lock();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let _guard = self.guard.lock();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        let _guard = self.guard.lock();
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        let _guard = self.guard.lock();
        self.delegate.hit_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LruCache, PerpetualCache};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let lru: SharedCache = Arc::new(LruCache::with_size(
            Arc::new(PerpetualCache::new("sync")),
            64,
        ));
        let cache = SynchronizedCache::new(lru);

        thread::scope(|s| {
            for t in 0..8 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..200 {
                        let key = CacheKey::from_parts([Value::Int(t), Value::Int(i)]);
                        cache.put(key.clone(), Value::Int(i)).unwrap();
                        cache.get(&key).unwrap();
                    }
                });
            }
        });

        assert_eq!(cache.size(), 64);
    }
}
