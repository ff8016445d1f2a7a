//! Executor Module
//!
//! Runs mapped statements for one unit of work:
//! - `LocalCache`: private per-executor result cache with a pending marker
//! - `DeferredLoad`: nested results resolved once the outermost query ends
//! - `Executor`: local cache controller, with optional routing through the
//!   namespace cache via a `TransactionalCacheManager`

pub mod base;
pub mod deferred;
pub mod local_cache;
pub mod statement;

pub use base::Executor;
pub use deferred::{DeferredLoad, TargetKind};
pub use local_cache::{LocalCache, LocalEntry};
pub use statement::{
    MappedStatement, MappedStatementBuilder, ParameterMapping, ParameterMode, Parameters,
    SqlCommandType, StatementType,
};

use crate::core::{Result, RowBounds, Value};
use serde::{Deserialize, Serialize};

/// Lifetime of the session-local cache
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocalCacheScope {
    /// Kept for the whole unit of work
    #[default]
    Session,
    /// Cleared after every top-level statement
    Statement,
}

/// Boundary to the SQL layer. Binding, execution and row mapping all live
/// behind this trait.
pub trait Database: Send + Sync {
    /// Run a select and return its rows.
    ///
    /// Nested selects go back through `executor` so they share its local
    /// cache. Callable statements write their OUT values into `params`.
    fn query(
        &self,
        executor: &mut Executor,
        statement: &MappedStatement,
        params: &mut Parameters,
        bounds: RowBounds,
    ) -> Result<Vec<Value>>;

    /// Run an insert, update or delete and return the affected row count
    fn update(&self, statement: &MappedStatement, params: &Parameters) -> Result<u64>;

    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        Ok(())
    }
}
