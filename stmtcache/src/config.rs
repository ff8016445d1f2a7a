use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::cache::{CacheBuilder, EvictionPolicy, SharedCache};
use crate::executor::LocalCacheScope;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Route cacheable statements through their namespace cache
    pub cache_enabled: bool,
    pub local_cache_scope: LocalCacheScope,
    /// Folded into every cache key when set
    pub environment_id: Option<String>,
    pub logging: LoggingConfig,
    pub caches: BTreeMap<String, CacheConfig>,
}

/// One namespace cache, using the mapper-file option names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub implementation: String,
    pub eviction: Option<EvictionPolicy>,
    /// Milliseconds between scheduled clears
    pub flush_interval: Option<u64>,
    pub size: Option<usize>,
    pub read_write: bool,
    pub blocking: bool,
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            local_cache_scope: LocalCacheScope::Session,
            environment_id: None,
            logging: LoggingConfig::default(),
            caches: BTreeMap::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            implementation: crate::cache::builder::PERPETUAL.to_string(),
            eviction: None,
            flush_interval: None,
            size: None,
            read_write: true,
            blocking: false,
            properties: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Assemble one shared cache per configured namespace
    pub fn build_caches(&self) -> crate::Result<HashMap<String, SharedCache>> {
        self.caches
            .iter()
            .map(|(id, cache)| {
                let shared = CacheBuilder::from_config(id.as_str(), cache).build()?;
                Ok((id.clone(), shared))
            })
            .collect()
    }
}
