//! LRU (Least Recently Used) eviction
//!
//! Access order is kept in a slab-backed doubly-linked list with an index
//! map from key to slot, so touch and evict are both O(1).

use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{Result, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_SIZE: usize = 1024;

/// Index into the slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlabIdx(u32);

struct SlabNode<T> {
    value: T,
    prev: Option<SlabIdx>,
    next: Option<SlabIdx>,
}

/// Doubly-linked list over a slab; head is least recently used, tail most.
struct IntrusiveList<T> {
    slots: Vec<Option<SlabNode<T>>>,
    free_indices: Vec<u32>,
    head: Option<SlabIdx>,
    tail: Option<SlabIdx>,
    len: usize,
}

impl<T> IntrusiveList<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn push_back(&mut self, value: T) -> SlabIdx {
        let idx = self.alloc_slot(value);

        if let Some(old_tail) = self.tail {
            if let Some(n) = self.node_mut(old_tail) {
                n.next = Some(idx);
            }
            if let Some(n) = self.node_mut(idx) {
                n.prev = Some(old_tail);
            }
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
        self.len += 1;
        idx
    }

    fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(head)
    }

    fn remove(&mut self, idx: SlabIdx) -> Option<T> {
        let node = self.slots.get_mut(idx.0 as usize)?.take()?;
        self.unlink(node.prev, node.next);
        self.free_indices.push(idx.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Move an existing node to the tail (most recently used)
    fn move_to_back(&mut self, idx: SlabIdx) {
        if self.tail == Some(idx) {
            return;
        }
        let Some((prev, next)) = self.node_ref(idx).map(|n| (n.prev, n.next)) else {
            return;
        };
        self.unlink(prev, next);

        let old_tail = self.tail;
        if let Some(t) = old_tail.and_then(|t| self.node_mut(t)) {
            t.next = Some(idx);
        }
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
            node.next = None;
        }
        if self.head.is_none() {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free_indices.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn unlink(&mut self, prev: Option<SlabIdx>, next: Option<SlabIdx>) {
        match prev.and_then(|p| self.node_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
    }

    fn alloc_slot(&mut self, value: T) -> SlabIdx {
        let node = SlabNode {
            value,
            prev: None,
            next: None,
        };
        if let Some(free) = self.free_indices.pop() {
            self.slots[free as usize] = Some(node);
            SlabIdx(free)
        } else {
            self.slots.push(Some(node));
            SlabIdx((self.slots.len() - 1) as u32)
        }
    }

    fn node_ref(&self, idx: SlabIdx) -> Option<&SlabNode<T>> {
        self.slots.get(idx.0 as usize)?.as_ref()
    }

    fn node_mut(&mut self, idx: SlabIdx) -> Option<&mut SlabNode<T>> {
        self.slots.get_mut(idx.0 as usize)?.as_mut()
    }
}

struct LruIndex {
    order: IntrusiveList<CacheKey>,
    slots: HashMap<CacheKey, SlabIdx>,
    size: usize,
}

impl LruIndex {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(&idx) = self.slots.get(key) {
            self.order.move_to_back(idx);
        }
    }

    /// Record `key` as most recent; returns the eldest key once over capacity
    fn cycle(&mut self, key: CacheKey) -> Option<CacheKey> {
        if let Some(&idx) = self.slots.get(&key) {
            self.order.move_to_back(idx);
            return None;
        }
        let idx = self.order.push_back(key.clone());
        self.slots.insert(key, idx);

        if self.order.len() > self.size {
            let eldest = self.order.pop_front()?;
            self.slots.remove(&eldest);
            return Some(eldest);
        }
        None
    }

    fn forget(&mut self, key: &CacheKey) {
        if let Some(idx) = self.slots.remove(key) {
            self.order.remove(idx);
        }
    }
}

/// Evicts the least recently used key once `size` keys are tracked
pub struct LruCache {
    delegate: SharedCache,
    index: Mutex<LruIndex>,
}

impl LruCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_size(delegate, DEFAULT_SIZE)
    }

    pub fn with_size(delegate: SharedCache, size: usize) -> Self {
        Self {
            delegate,
            index: Mutex::new(LruIndex {
                order: IntrusiveList::new(),
                slots: HashMap::new(),
                size: size.max(1),
            }),
        }
    }

    /// Change the capacity. Takes effect on the next insert.
    pub fn set_size(&self, size: usize) {
        self.index.lock().size = size.max(1);
    }
}

impl Cache for LruCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.delegate.put(key.clone(), value)?;
        let eldest = self.index.lock().cycle(key);
        if let Some(eldest) = eldest {
            debug!("LRU evict cache={}, key={}", self.id(), eldest);
            self.delegate.remove(&eldest);
        }
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        self.index.lock().touch(key);
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.index.lock().forget(key);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let mut index = self.index.lock();
        index.order.clear();
        index.slots.clear();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        self.delegate.hit_ratio()
    }
}
