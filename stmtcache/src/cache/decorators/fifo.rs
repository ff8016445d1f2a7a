//! FIFO (First In, First Out) eviction

use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{Result, Value};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

pub const DEFAULT_SIZE: usize = 1024;

struct FifoQueue {
    keys: VecDeque<CacheKey>,
    /// Membership index over `keys`
    queued: HashSet<CacheKey>,
    size: usize,
}

/// Evicts in strict insertion order regardless of reads.
///
/// Re-putting a key already queued keeps its original position.
pub struct FifoCache {
    delegate: SharedCache,
    queue: Mutex<FifoQueue>,
}

impl FifoCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_size(delegate, DEFAULT_SIZE)
    }

    pub fn with_size(delegate: SharedCache, size: usize) -> Self {
        Self {
            delegate,
            queue: Mutex::new(FifoQueue {
                keys: VecDeque::new(),
                queued: HashSet::new(),
                size: size.max(1),
            }),
        }
    }

    pub fn set_size(&self, size: usize) {
        self.queue.lock().size = size.max(1);
    }

    fn cycle_key_list(&self, key: &CacheKey) -> Option<CacheKey> {
        let mut queue = self.queue.lock();
        if !queue.queued.insert(key.clone()) {
            return None;
        }
        queue.keys.push_back(key.clone());
        if queue.keys.len() > queue.size {
            let oldest = queue.keys.pop_front()?;
            queue.queued.remove(&oldest);
            Some(oldest)
        } else {
            None
        }
    }
}

impl Cache for FifoCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        if let Some(oldest) = self.cycle_key_list(&key) {
            debug!("FIFO evict cache={}, key={}", self.id(), oldest);
            self.delegate.remove(&oldest);
        }
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let mut queue = self.queue.lock();
        if queue.queued.remove(key) {
            queue.keys.retain(|k| k != key);
        }
        drop(queue);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let mut queue = self.queue.lock();
        queue.keys.clear();
        queue.queued.clear();
        drop(queue);
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        self.delegate.hit_ratio()
    }
}
