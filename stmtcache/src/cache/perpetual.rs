use super::{Cache, CacheKey};
use crate::core::{Result, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Base store: a single unbounded map with no eviction of its own.
///
/// The map sits behind a lock only because `Cache` methods take `&self`;
/// compound operations across a decorator chain are not atomic unless a
/// `SynchronizedCache` or `BlockingCache` wraps it.
pub struct PerpetualCache {
    id: String,
    entries: RwLock<HashMap<CacheKey, Value>>,
}

impl PerpetualCache {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.entries.write().remove(key)
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn size(&self) -> usize {
        self.entries.read().len()
    }
}

impl PartialEq for PerpetualCache {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PerpetualCache {}

impl Hash for PerpetualCache {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for PerpetualCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerpetualCache")
            .field("id", &self.id)
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SharedCache;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_parts([s])
    }

    #[test]
    fn test_put_get_remove() {
        let cache = PerpetualCache::new("users");

        cache.put(key("a"), Value::Int(1)).unwrap();
        assert_eq!(cache.get(&key("a")).unwrap(), Some(Value::Int(1)));
        assert_eq!(cache.size(), 1);

        assert_eq!(cache.remove(&key("a")), Some(Value::Int(1)));
        assert_eq!(cache.get(&key("a")).unwrap(), None);
        assert_eq!(cache.remove(&key("a")), None);
    }

    #[test]
    fn test_null_is_distinct_from_absent() {
        let cache = PerpetualCache::new("users");
        cache.put(key("a"), Value::Null).unwrap();

        assert_eq!(cache.get(&key("a")).unwrap(), Some(Value::Null));
        assert_eq!(cache.get(&key("b")).unwrap(), None);
        assert!(cache.contains_key(&key("a")));
    }

    #[test]
    fn test_clear() {
        let cache = PerpetualCache::new("users");
        cache.put(key("a"), Value::Int(1)).unwrap();
        cache.put(key("b"), Value::Int(2)).unwrap();

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_identity_is_id_only() {
        let a = PerpetualCache::new("users");
        let b = PerpetualCache::new("users");
        a.put(key("x"), Value::Int(1)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, PerpetualCache::new("orders"));

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_dyn_cache_identity() {
        let a: SharedCache = Arc::new(PerpetualCache::new("users"));
        let b: SharedCache = Arc::new(PerpetualCache::new("users"));
        assert!(*a == *b);
    }
}
