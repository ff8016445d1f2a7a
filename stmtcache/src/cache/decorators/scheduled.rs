use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{Result, Value};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_CLEAR_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Wipes the whole cache once `clear_interval` has elapsed since the last
/// wipe. The check runs lazily before every operation; there is no timer.
pub struct ScheduledCache {
    delegate: SharedCache,
    clear_interval: Duration,
    last_clear: Mutex<Instant>,
}

impl ScheduledCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_interval(delegate, DEFAULT_CLEAR_INTERVAL)
    }

    pub fn with_interval(delegate: SharedCache, clear_interval: Duration) -> Self {
        Self {
            delegate,
            clear_interval,
            last_clear: Mutex::new(Instant::now()),
        }
    }

    pub fn clear_interval(&self) -> Duration {
        self.clear_interval
    }

    /// Clear if stale. Returns true when a clear happened.
    fn clear_when_stale(&self) -> bool {
        let mut last_clear = self.last_clear.lock();
        if last_clear.elapsed() > self.clear_interval {
            debug!(
                "Scheduled flush cache={}, interval={}ms",
                self.id(),
                self.clear_interval.as_millis()
            );
            *last_clear = Instant::now();
            self.delegate.clear();
            true
        } else {
            false
        }
    }
}

impl Cache for ScheduledCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.clear_when_stale();
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        if self.clear_when_stale() {
            Ok(None)
        } else {
            self.delegate.get(key)
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.clear_when_stale();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        *self.last_clear.lock() = Instant::now();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.clear_when_stale();
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        self.delegate.hit_ratio()
    }
}
