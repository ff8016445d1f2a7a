//! Cache Builder
//!
//! Assembles a namespace cache. Layer order, innermost first:
//!
//! base store → eviction → serialized (read_write) → logging →
//! synchronized → blocking (if requested) → scheduled (if a flush interval
//! is set)
//!
//! The order is part of the contract: policies do not commute. A custom
//! base implementation is only wrapped in the logging layer.

use super::decorators::{
    BlockingCache, FifoCache, LoggingCache, LruCache, ReferenceCache, ReferenceStrength,
    ScheduledCache, SerializedCache, SynchronizedCache,
};
use super::{PerpetualCache, SharedCache};
use crate::config::CacheConfig;
use crate::core::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Name of the built-in base store
pub const PERPETUAL: &str = "perpetual";

/// Eviction decorator selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionPolicy {
    Lru,
    Fifo,
    Soft,
    Weak,
}

/// Creates a custom base store from `(namespace id, properties)`
pub type CacheFactory =
    Arc<dyn Fn(&str, &HashMap<String, String>) -> Result<SharedCache> + Send + Sync>;

pub struct CacheBuilder {
    id: String,
    implementation: String,
    factories: HashMap<String, CacheFactory>,
    eviction: Option<EvictionPolicy>,
    clear_interval: Option<Duration>,
    size: Option<usize>,
    read_write: bool,
    blocking: bool,
    properties: HashMap<String, String>,
}

impl CacheBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            implementation: PERPETUAL.to_string(),
            factories: HashMap::new(),
            eviction: None,
            clear_interval: None,
            size: None,
            read_write: true,
            blocking: false,
            properties: HashMap::new(),
        }
    }

    /// Start from a deserialized namespace configuration
    pub fn from_config(id: impl Into<String>, config: &CacheConfig) -> Self {
        Self::new(id)
            .implementation(&config.implementation)
            .eviction(config.eviction)
            .clear_interval(config.flush_interval.map(Duration::from_millis))
            .size(config.size)
            .read_write(config.read_write)
            .blocking(config.blocking)
            .properties(config.properties.clone())
    }

    pub fn implementation(mut self, name: &str) -> Self {
        self.implementation = name.to_string();
        self
    }

    /// Make a custom base store available under `name`
    pub fn register_implementation(mut self, name: &str, factory: CacheFactory) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }

    pub fn eviction(mut self, policy: Option<EvictionPolicy>) -> Self {
        self.eviction = policy;
        self
    }

    pub fn clear_interval(mut self, interval: Option<Duration>) -> Self {
        self.clear_interval = interval;
        self
    }

    pub fn size(mut self, size: Option<usize>) -> Self {
        self.size = size;
        self
    }

    pub fn read_write(mut self, read_write: bool) -> Self {
        self.read_write = read_write;
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    pub fn property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    /// Layer names, innermost first, that `build` will assemble
    pub fn planned_layers(&self) -> Vec<&'static str> {
        if self.implementation != PERPETUAL {
            return vec!["custom", "logging"];
        }

        let mut layers = vec![PERPETUAL];
        match self.eviction {
            Some(EvictionPolicy::Lru) => layers.push("lru"),
            Some(EvictionPolicy::Fifo) => layers.push("fifo"),
            Some(EvictionPolicy::Soft) => layers.push("soft"),
            Some(EvictionPolicy::Weak) => layers.push("weak"),
            None => {}
        }
        if self.read_write {
            layers.push("serialized");
        }
        layers.push("logging");
        layers.push("synchronized");
        if self.blocking {
            layers.push("blocking");
        }
        if self.clear_interval.is_some() {
            layers.push("scheduled");
        }
        layers
    }

    pub fn build(self) -> Result<SharedCache> {
        let base = self.new_base_cache()?;

        if self.implementation != PERPETUAL {
            info!(
                "Built cache id={}, implementation={} (custom, logging only)",
                self.id, self.implementation
            );
            return Ok(Arc::new(LoggingCache::new(base)));
        }

        let cache = self.set_standard_decorators(base)?;
        info!(
            "Built cache id={}, layers={}",
            self.id,
            self.planned_layers().join(" > ")
        );
        Ok(cache)
    }

    fn new_base_cache(&self) -> Result<SharedCache> {
        if self.implementation == PERPETUAL {
            return Ok(Arc::new(PerpetualCache::new(self.id.clone())));
        }

        let factory = self
            .factories
            .get(&self.implementation)
            .ok_or_else(|| CacheError::UnknownImplementation(self.implementation.clone()))?;
        let cache = factory(&self.id, &self.properties)?;
        if cache.id() != self.id {
            return Err(CacheError::Config(format!(
                "implementation {} produced cache id {} instead of {}",
                self.implementation,
                cache.id(),
                self.id
            )));
        }
        Ok(cache)
    }

    fn set_standard_decorators(&self, base: SharedCache) -> Result<SharedCache> {
        let size = match self.size {
            Some(size) => Some(size),
            None => self.numeric_property("size")?.map(|n| n as usize),
        };

        let mut cache = base;
        cache = match self.eviction {
            Some(EvictionPolicy::Lru) => Arc::new(match size {
                Some(n) => LruCache::with_size(cache, n),
                None => LruCache::new(cache),
            }),
            Some(EvictionPolicy::Fifo) => Arc::new(match size {
                Some(n) => FifoCache::with_size(cache, n),
                None => FifoCache::new(cache),
            }),
            Some(EvictionPolicy::Soft) => Arc::new(self.reference(cache, ReferenceStrength::Soft, size)),
            Some(EvictionPolicy::Weak) => Arc::new(self.reference(cache, ReferenceStrength::Weak, size)),
            None => cache,
        };
        if self.read_write {
            cache = Arc::new(SerializedCache::new(cache));
        }
        cache = Arc::new(LoggingCache::new(cache));
        cache = Arc::new(SynchronizedCache::new(cache));
        if self.blocking {
            let mut blocking = BlockingCache::new(cache);
            if let Some(ms) = self.numeric_property("timeout")? {
                blocking.set_timeout(Duration::from_millis(ms));
            }
            cache = Arc::new(blocking);
        }
        if let Some(interval) = self.clear_interval {
            cache = Arc::new(ScheduledCache::with_interval(cache, interval));
        }
        Ok(cache)
    }

    fn reference(
        &self,
        delegate: SharedCache,
        strength: ReferenceStrength,
        size: Option<usize>,
    ) -> ReferenceCache {
        match size {
            Some(n) => ReferenceCache::with_hard_links(delegate, strength, n),
            None => ReferenceCache::new(delegate, strength),
        }
    }

    fn numeric_property(&self, name: &str) -> Result<Option<u64>> {
        self.properties
            .get(name)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|_| {
                    CacheError::Config(format!(
                        "property {}={} on cache {} is not a non-negative integer",
                        name, raw, self.id
                    ))
                })
            })
            .transpose()
    }
}
