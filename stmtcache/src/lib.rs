pub mod cache;
pub mod config;
pub mod core;
pub mod executor;
pub mod logging;
pub mod session;

// Re-export commonly used types
pub use cache::{
    BlockingCache, Cache, CacheBuilder, CacheFactory, CacheKey, EvictionPolicy, FifoCache,
    LoggingCache, LruCache, PerpetualCache, ReferenceCache, ReferenceStrength, ScheduledCache,
    SerializedCache, SharedCache, SynchronizedCache, TransactionalCache,
    TransactionalCacheManager, compute_cache_key,
};
pub use config::{CacheConfig, EngineConfig, LoggingConfig};
pub use core::{CacheError, Result, RowBounds, Value, ValueRef};
pub use executor::{
    Database, DeferredLoad, Executor, LocalCache, LocalCacheScope, LocalEntry, MappedStatement,
    ParameterMapping, ParameterMode, Parameters, SqlCommandType, StatementType, TargetKind,
};
pub use session::{Session, SessionFactory};
