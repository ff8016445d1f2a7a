//! Blocking decorator
//!
//! A miss leaves a per-key latch held until some caller `put`s (or
//! `remove`s) the key. Other callers asking for the key wait (up to the
//! configured timeout) instead of recomputing it.
//!
//! The latch has no owner. Whichever unit of work missed may populate it
//! from any thread, and a second read of a held key always waits, even
//! from the thread that missed. `TransactionalCache` never reads a key it
//! already missed, and writes an explicit null for every such key when it
//! commits or rolls back, so an abandoned computation still unblocks the
//! waiters. Removing that write deadlocks them.

use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{CacheError, Result, Value};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Default)]
struct KeyLatch {
    held: Mutex<bool>,
    released: Condvar,
}

pub struct BlockingCache {
    delegate: SharedCache,
    /// `None` waits forever
    timeout: Option<Duration>,
    latches: Mutex<HashMap<CacheKey, Arc<KeyLatch>>>,
}

impl BlockingCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self {
            delegate,
            timeout: None,
            latches: Mutex::new(HashMap::new()),
        }
    }

    /// Zero means wait forever
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether a miss on `key` is still waiting for its population
    pub fn is_held(&self, key: &CacheKey) -> bool {
        self.latches
            .lock()
            .get(key)
            .is_some_and(|latch| *latch.held.lock())
    }

    fn latch_for(&self, key: &CacheKey) -> Arc<KeyLatch> {
        let mut latches = self.latches.lock();
        Arc::clone(latches.entry(key.clone()).or_default())
    }

    fn acquire_lock(&self, key: &CacheKey) -> Result<()> {
        let latch = self.latch_for(key);
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let mut held = latch.held.lock();
        while *held {
            match deadline {
                Some(deadline) => {
                    if latch.released.wait_until(&mut held, deadline).timed_out() && *held {
                        return Err(self.timeout_error(key));
                    }
                }
                None => latch.released.wait(&mut held),
            }
        }
        *held = true;
        Ok(())
    }

    fn release_lock(&self, key: &CacheKey) {
        let latch = match self.latches.lock().get(key) {
            Some(latch) => Arc::clone(latch),
            None => return,
        };
        let mut held = latch.held.lock();
        if *held {
            *held = false;
            latch.released.notify_all();
        }
    }

    fn timeout_error(&self, key: &CacheKey) -> CacheError {
        CacheError::Timeout {
            namespace: self.id().to_string(),
            key: key.to_string(),
            timeout_ms: self.timeout.map_or(0, |t| t.as_millis() as u64),
        }
    }
}

impl Cache for BlockingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        let result = self.delegate.put(key.clone(), value);
        self.release_lock(&key);
        result
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        self.acquire_lock(key)?;
        match self.delegate.get(key) {
            Ok(Some(value)) if !value.is_null() => {
                self.release_lock(key);
                Ok(Some(value))
            }
            Ok(miss) => {
                debug!("Blocking miss cache={}, key={} (lock held)", self.id(), key);
                Ok(miss)
            }
            Err(e) => {
                self.release_lock(key);
                Err(e)
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let removed = self.delegate.remove(key);
        self.release_lock(key);
        removed
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        self.delegate.hit_ratio()
    }
}
