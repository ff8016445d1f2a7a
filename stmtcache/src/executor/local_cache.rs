use super::statement::Parameters;
use crate::cache::CacheKey;
use crate::core::Value;
use std::collections::HashMap;

/// State of one key in the session-local cache
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEntry {
    /// The query for this key is executing right now
    Pending,
    Loaded(Vec<Value>),
}

/// Cache private to one executor. No locking: an executor belongs to a
/// single unit of work and is never shared between threads.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<CacheKey, LocalEntry>,
    output_parameters: HashMap<CacheKey, Parameters>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&LocalEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn put_pending(&mut self, key: CacheKey) {
        self.entries.insert(key, LocalEntry::Pending);
    }

    pub fn put_loaded(&mut self, key: CacheKey, rows: Vec<Value>) {
        self.entries.insert(key, LocalEntry::Loaded(rows));
    }

    /// Rows for a fully loaded key; `None` while pending or absent
    pub fn loaded(&self, key: &CacheKey) -> Option<&[Value]> {
        match self.entries.get(key) {
            Some(LocalEntry::Loaded(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<LocalEntry> {
        self.entries.remove(key)
    }

    pub fn put_output_parameters(&mut self, key: CacheKey, outputs: Parameters) {
        self.output_parameters.insert(key, outputs);
    }

    pub fn output_parameters(&self, key: &CacheKey) -> Option<&Parameters> {
        self.output_parameters.get(key)
    }

    /// Wipe results and cached output parameters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.output_parameters.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
