//! Cache Module
//!
//! Provides the caching tiers of the statement executor:
//! - `CacheKey`: query fingerprinting
//! - `PerpetualCache`: unbounded base store, identified by namespace id
//! - decorators: one policy each (eviction, isolation, logging, locking, scheduling)
//! - `TransactionalCache` / `TransactionalCacheManager`: per-unit-of-work write buffering
//! - `CacheBuilder`: assembles a decorator chain in a fixed order

pub mod builder;
pub mod decorators;
pub mod key;
pub mod perpetual;
pub mod transactional;
pub mod tx_manager;

pub use builder::{CacheBuilder, CacheFactory, EvictionPolicy};
pub use decorators::{
    BlockingCache, FifoCache, LoggingCache, LruCache, ReferenceCache, ReferenceStrength,
    ScheduledCache, SerializedCache, SynchronizedCache,
};
pub use key::{CacheKey, compute_cache_key};
pub use perpetual::PerpetualCache;
pub use transactional::TransactionalCache;
pub use tx_manager::TransactionalCacheManager;

use crate::core::{Result, Value};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A namespace-scoped key/value store.
///
/// Identity is the namespace id alone. `get` returns `Ok(None)` for an
/// absent key and `Ok(Some(Value::Null))` for a key explicitly stored as
/// null; readers treat both as a miss.
pub trait Cache: Send + Sync {
    fn id(&self) -> &str;

    fn put(&self, key: CacheKey, value: Value) -> Result<()>;

    fn get(&self, key: &CacheKey) -> Result<Option<Value>>;

    fn remove(&self, key: &CacheKey) -> Option<Value>;

    fn clear(&self);

    fn size(&self) -> usize;

    /// Hit ratio observed by a logging layer somewhere in the chain
    fn hit_ratio(&self) -> Option<f64> {
        None
    }
}

/// Shared handle to an assembled cache chain
pub type SharedCache = Arc<dyn Cache>;

impl PartialEq for dyn Cache + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for dyn Cache + '_ {}

impl Hash for dyn Cache + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
