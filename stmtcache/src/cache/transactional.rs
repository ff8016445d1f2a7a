//! Transactional Cache
//!
//! Buffers writes to one shared cache for the length of a unit of work.
//! Nothing reaches the shared cache before `commit`; reads go straight to
//! it, except for keys this unit of work already missed.

use super::{CacheKey, SharedCache};
use crate::core::{Result, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct TransactionalCache {
    delegate: SharedCache,
    clear_on_commit: bool,
    /// Pending writes in arrival order; `pending_index` maps key → position
    entries_to_add_on_commit: Vec<(CacheKey, Value)>,
    pending_index: HashMap<CacheKey, usize>,
    entries_missed_in_cache: HashSet<CacheKey>,
}

impl TransactionalCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self {
            delegate,
            clear_on_commit: false,
            entries_to_add_on_commit: Vec::new(),
            pending_index: HashMap::new(),
            entries_missed_in_cache: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.delegate.id()
    }

    pub fn delegate(&self) -> &SharedCache {
        &self.delegate
    }

    pub fn size(&self) -> usize {
        self.delegate.size()
    }

    /// Read through to the shared cache, ignoring this transaction's own
    /// pending writes.
    ///
    /// A key already missed in this unit of work stays a miss without
    /// another read: a blocking delegate is still holding it for us.
    pub fn get(&mut self, key: &CacheKey) -> Result<Option<Value>> {
        if self.entries_missed_in_cache.contains(key) {
            return Ok(None);
        }
        let value = self.delegate.get(key)?;
        if value.as_ref().is_none_or(Value::is_null) {
            self.entries_missed_in_cache.insert(key.clone());
        }
        if self.clear_on_commit {
            Ok(None)
        } else {
            Ok(value)
        }
    }

    pub fn put(&mut self, key: CacheKey, value: Value) {
        match self.pending_index.get(&key) {
            Some(&pos) => self.entries_to_add_on_commit[pos].1 = value,
            None => {
                self.pending_index
                    .insert(key.clone(), self.entries_to_add_on_commit.len());
                self.entries_to_add_on_commit.push((key, value));
            }
        }
    }

    /// Mark the shared cache for wiping at commit and drop queued writes
    pub fn clear(&mut self) {
        self.clear_on_commit = true;
        self.entries_to_add_on_commit.clear();
        self.pending_index.clear();
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.entries_to_add_on_commit.is_empty()
    }

    pub fn is_clear_on_commit(&self) -> bool {
        self.clear_on_commit
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.clear_on_commit {
            self.delegate.clear();
        }
        let result = self.flush_pending_entries();
        self.reset();
        result
    }

    pub fn rollback(&mut self) -> Result<()> {
        let result = self.unlock_missed_entries();
        self.reset();
        result
    }

    fn flush_pending_entries(&mut self) -> Result<()> {
        debug!(
            "Commit cache={}, writes={}, misses={}",
            self.id(),
            self.entries_to_add_on_commit.len(),
            self.entries_missed_in_cache.len()
        );
        let mut first_error = None;
        for (key, value) in self.entries_to_add_on_commit.drain(..) {
            if let Err(e) = self.delegate.put(key, value) {
                first_error.get_or_insert(e);
            }
        }
        // Null for every miss that was never written: releases any
        // population latch a BlockingCache holds for this unit of work.
        for key in self.entries_missed_in_cache.drain() {
            if !self.pending_index.contains_key(&key) {
                if let Err(e) = self.delegate.put(key, Value::Null) {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn unlock_missed_entries(&mut self) -> Result<()> {
        let mut first_error = None;
        for key in self.entries_missed_in_cache.drain() {
            if let Err(e) = self.delegate.put(key, Value::Null) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn reset(&mut self) {
        self.clear_on_commit = false;
        self.entries_to_add_on_commit.clear();
        self.pending_index.clear();
        self.entries_missed_in_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, PerpetualCache};
    use std::sync::Arc;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_parts([s])
    }

    fn setup() -> (Arc<PerpetualCache>, TransactionalCache) {
        let shared = Arc::new(PerpetualCache::new("tx"));
        let tx = TransactionalCache::new(shared.clone());
        (shared, tx)
    }

    #[test]
    fn test_write_invisible_until_commit() {
        let (shared, mut tx) = setup();
        shared.put(key("k"), Value::Int(1)).unwrap();

        tx.put(key("k"), Value::Int(2));
        assert_eq!(tx.get(&key("k")).unwrap(), Some(Value::Int(1)));
        assert_eq!(shared.get(&key("k")).unwrap(), Some(Value::Int(1)));

        tx.commit().unwrap();
        assert_eq!(shared.get(&key("k")).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let (shared, mut tx) = setup();
        tx.put(key("k"), Value::Int(2));
        tx.rollback().unwrap();

        assert_eq!(shared.get(&key("k")).unwrap(), None);
        assert!(!tx.has_pending_writes());
    }

    #[test]
    fn test_clear_then_commit_wipes_delegate() {
        let (shared, mut tx) = setup();
        shared.put(key("old"), Value::Int(1)).unwrap();

        tx.put(key("early"), Value::Int(2));
        tx.clear();
        assert_eq!(tx.get(&key("old")).unwrap(), None);

        tx.commit().unwrap();
        assert_eq!(shared.get(&key("old")).unwrap(), None);
        assert_eq!(shared.get(&key("early")).unwrap(), None);
    }

    #[test]
    fn test_writes_after_clear_survive_commit() {
        let (shared, mut tx) = setup();
        shared.put(key("old"), Value::Int(1)).unwrap();

        tx.clear();
        tx.put(key("new"), Value::Int(2));
        tx.commit().unwrap();

        assert_eq!(shared.size(), 1);
        assert_eq!(shared.get(&key("new")).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_missed_keys_written_as_null() {
        let (shared, mut tx) = setup();
        assert_eq!(tx.get(&key("miss")).unwrap(), None);
        assert_eq!(tx.get(&key("filled")).unwrap(), None);
        tx.put(key("filled"), Value::Int(9));
        tx.commit().unwrap();

        assert_eq!(shared.get(&key("miss")).unwrap(), Some(Value::Null));
        assert_eq!(shared.get(&key("filled")).unwrap(), Some(Value::Int(9)));
    }

    #[test]
    fn test_repeated_miss_skips_delegate() {
        let (shared, mut tx) = setup();
        assert_eq!(tx.get(&key("k")).unwrap(), None);
        shared.put(key("k"), Value::Int(5)).unwrap();

        assert_eq!(tx.get(&key("k")).unwrap(), None);
        tx.rollback().unwrap();
        assert_eq!(tx.get(&key("k")).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_rollback_nulls_missed_keys() {
        let (shared, mut tx) = setup();
        tx.get(&key("miss")).unwrap();
        tx.put(key("miss"), Value::Int(3));
        tx.rollback().unwrap();

        assert_eq!(shared.get(&key("miss")).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_state_resets_between_units_of_work() {
        let (shared, mut tx) = setup();
        tx.clear();
        tx.commit().unwrap();
        assert!(!tx.is_clear_on_commit());

        shared.put(key("k"), Value::Int(1)).unwrap();
        assert_eq!(tx.get(&key("k")).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_last_write_wins() {
        let (shared, mut tx) = setup();
        tx.put(key("k"), Value::Int(1));
        tx.put(key("k"), Value::Int(2));
        tx.commit().unwrap();

        assert_eq!(shared.get(&key("k")).unwrap(), Some(Value::Int(2)));
    }
}
