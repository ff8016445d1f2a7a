use thiserror::Error;

/// Main error type for cache and executor operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Couldn't get a lock in {timeout_ms}ms for key {key} at cache {namespace}")]
    Timeout {
        namespace: String,
        key: String,
        timeout_ms: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Recursive query for key {key} in statement {statement} while its result is still pending")]
    RecursiveQuery { statement: String, key: String },

    #[error(
        "Caching stored procedures with OUT params is not supported. Please configure use_cache=false in {0} statement."
    )]
    OutParamsNotCacheable(String),

    #[error("Statement {statement} returned more than one row ({count}) where at most one was expected")]
    TooManyResults { statement: String, count: usize },

    #[error("Executor was closed")]
    ExecutorClosed,

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Invalid cache configuration: {0}")]
    Config(String),

    #[error("Unknown cache implementation: {0}")]
    UnknownImplementation(String),
}

impl CacheError {
    /// Whether the failure came from waiting on another caller's lock
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
