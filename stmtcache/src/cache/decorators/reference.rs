//! Reference-based eviction (soft / weak)
//!
//! The delegate only ever stores a weak handle (`Value::Ref`). Strong
//! ownership lives in a bounded ring of recently used values, so an entry
//! is reclaimed as soon as nothing holds it any more. There is no tracing
//! collector here: "collection" happens exactly when the last strong
//! holder leaves the ring, and the delegate is swept of dead handles
//! opportunistically on the next operation.

use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{Result, Value, ValueRef};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_HARD_LINKS: usize = 256;

/// How strongly freshly written entries are held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceStrength {
    /// Writes and reads both enter the strong ring
    Soft,
    /// Only reads enter the strong ring; an unread write survives until
    /// the next write to this cache
    Weak,
}

struct ReferenceState {
    hard_links: VecDeque<(CacheKey, Arc<Value>)>,
    capacity: usize,
    nursery: Option<(CacheKey, Arc<Value>)>,
    collected: VecDeque<CacheKey>,
}

impl ReferenceState {
    fn hold(&mut self, key: CacheKey, value: Arc<Value>) {
        self.hard_links.push_back((key, value));
        while self.hard_links.len() > self.capacity {
            if let Some((key, value)) = self.hard_links.pop_front() {
                self.release(key, value);
            }
        }
    }

    fn nurse(&mut self, key: CacheKey, value: Arc<Value>) {
        if let Some((key, value)) = self.nursery.replace((key, value)) {
            self.release(key, value);
        }
    }

    fn release(&mut self, key: CacheKey, value: Arc<Value>) {
        if Arc::strong_count(&value) == 1 {
            self.collected.push_back(key);
        }
    }
}

/// Decorator holding values through weak handles plus a strong ring
pub struct ReferenceCache {
    delegate: SharedCache,
    strength: ReferenceStrength,
    state: Mutex<ReferenceState>,
}

impl ReferenceCache {
    pub fn new(delegate: SharedCache, strength: ReferenceStrength) -> Self {
        Self::with_hard_links(delegate, strength, DEFAULT_HARD_LINKS)
    }

    pub fn soft(delegate: SharedCache) -> Self {
        Self::new(delegate, ReferenceStrength::Soft)
    }

    pub fn weak(delegate: SharedCache) -> Self {
        Self::new(delegate, ReferenceStrength::Weak)
    }

    pub fn with_hard_links(
        delegate: SharedCache,
        strength: ReferenceStrength,
        hard_links: usize,
    ) -> Self {
        Self {
            delegate,
            strength,
            state: Mutex::new(ReferenceState {
                hard_links: VecDeque::new(),
                capacity: hard_links.max(1),
                nursery: None,
                collected: VecDeque::new(),
            }),
        }
    }

    pub fn strength(&self) -> ReferenceStrength {
        self.strength
    }

    /// Resize the strong ring
    pub fn set_size(&self, hard_links: usize) {
        let mut state = self.state.lock();
        state.capacity = hard_links.max(1);
        while state.hard_links.len() > state.capacity {
            if let Some((key, value)) = state.hard_links.pop_front() {
                state.release(key, value);
            }
        }
    }

    /// Remove delegate entries whose referent has been reclaimed
    fn drain_collected(&self) {
        let collected: Vec<CacheKey> = self.state.lock().collected.drain(..).collect();
        for key in collected {
            // The key may have been rewritten since its old value died
            if let Ok(Some(Value::Ref(handle))) = self.delegate.get(&key) {
                if handle.is_collected() {
                    debug!("Reference evict cache={}, key={}", self.id(), key);
                    self.delegate.remove(&key);
                }
            }
        }
    }

    fn resolve(value: Value) -> Option<Value> {
        match value {
            Value::Ref(handle) => handle.upgrade().map(|v| (*v).clone()),
            other => Some(other),
        }
    }
}

impl Cache for ReferenceCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.drain_collected();

        if value.is_null() {
            return self.delegate.put(key, value);
        }

        let strong = Arc::new(value);
        self.delegate
            .put(key.clone(), Value::Ref(ValueRef::new(&strong)))?;

        let mut state = self.state.lock();
        match self.strength {
            ReferenceStrength::Soft => state.hold(key, strong),
            ReferenceStrength::Weak => state.nurse(key, strong),
        }
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        self.drain_collected();

        match self.delegate.get(key)? {
            Some(Value::Ref(handle)) => match handle.upgrade() {
                Some(strong) => {
                    let value = (*strong).clone();
                    self.state.lock().hold(key.clone(), strong);
                    Ok(Some(value))
                }
                None => {
                    self.delegate.remove(key);
                    Ok(None)
                }
            },
            other => Ok(other),
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.drain_collected();
        self.delegate.remove(key).and_then(Self::resolve)
    }

    fn clear(&self) {
        {
            let mut state = self.state.lock();
            state.hard_links.clear();
            state.nursery = None;
            state.collected.clear();
        }
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.drain_collected();
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        self.delegate.hit_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_parts([s])
    }

    fn cache(strength: ReferenceStrength, hard_links: usize) -> ReferenceCache {
        ReferenceCache::with_hard_links(
            Arc::new(PerpetualCache::new("refs")),
            strength,
            hard_links,
        )
    }

    #[test]
    fn test_soft_keeps_recent_writes() {
        let cache = cache(ReferenceStrength::Soft, 2);
        cache.put(key("A"), Value::Int(1)).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();

        assert_eq!(cache.get(&key("A")).unwrap(), Some(Value::Int(1)));
        assert_eq!(cache.get(&key("B")).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_soft_reclaims_when_ring_overflows() {
        let cache = cache(ReferenceStrength::Soft, 2);
        cache.put(key("A"), Value::Int(1)).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();
        cache.put(key("C"), Value::Int(3)).unwrap();

        // A left the ring with no other holder; the drain sweeps it
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.get(&key("A")).unwrap(), None);
        assert_eq!(cache.get(&key("C")).unwrap(), Some(Value::Int(3)));
    }

    #[test]
    fn test_reads_keep_hot_entries_alive() {
        let cache = cache(ReferenceStrength::Soft, 2);
        cache.put(key("A"), Value::Int(1)).unwrap();
        cache.get(&key("A")).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();
        cache.put(key("C"), Value::Int(3)).unwrap();

        // both the write and the read copy of A were pushed out by B and C
        assert_eq!(cache.get(&key("A")).unwrap(), None);

        let cache = cache_with_read_between();
        assert_eq!(cache.get(&key("A")).unwrap(), Some(Value::Int(1)));
    }

    fn cache_with_read_between() -> ReferenceCache {
        let cache = cache(ReferenceStrength::Soft, 3);
        cache.put(key("A"), Value::Int(1)).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();
        cache.get(&key("A")).unwrap();
        cache.put(key("C"), Value::Int(3)).unwrap();
        cache
    }

    #[test]
    fn test_weak_write_survives_until_next_write() {
        let cache = cache(ReferenceStrength::Weak, 4);
        cache.put(key("A"), Value::Int(1)).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();

        assert_eq!(cache.get(&key("A")).unwrap(), None);
        assert_eq!(cache.get(&key("B")).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_weak_read_pins_value() {
        let cache = cache(ReferenceStrength::Weak, 4);
        cache.put(key("A"), Value::Int(1)).unwrap();
        cache.get(&key("A")).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();

        assert_eq!(cache.get(&key("A")).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_null_stored_directly() {
        let cache = cache(ReferenceStrength::Weak, 4);
        cache.put(key("A"), Value::Null).unwrap();
        cache.put(key("B"), Value::Int(2)).unwrap();

        assert_eq!(cache.get(&key("A")).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_rewritten_key_not_swept() {
        let cache = cache(ReferenceStrength::Soft, 1);
        cache.put(key("A"), Value::Int(1)).unwrap();
        // pushes the first A out of the ring and queues A for sweeping
        cache.put(key("A"), Value::Int(2)).unwrap();

        assert_eq!(cache.get(&key("A")).unwrap(), Some(Value::Int(2)));
    }
}
