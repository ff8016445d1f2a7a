use super::local_cache::LocalCache;
use crate::cache::CacheKey;
use crate::core::{CacheError, Result, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// How a deferred result is assigned to its target property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// At most one row; zero rows assign null
    Single,
    Many,
}

/// A nested result waiting for its owning query to finish loading
pub struct DeferredLoad {
    target: Arc<Mutex<Value>>,
    property: String,
    key: CacheKey,
    kind: TargetKind,
    statement_id: String,
}

impl DeferredLoad {
    pub fn new(
        target: Arc<Mutex<Value>>,
        property: &str,
        key: CacheKey,
        kind: TargetKind,
        statement_id: &str,
    ) -> Self {
        Self {
            target,
            property: property.to_string(),
            key,
            kind,
            statement_id: statement_id.to_string(),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn can_load(&self, local: &LocalCache) -> bool {
        local.loaded(&self.key).is_some()
    }

    /// Assign the cached rows to the target property
    pub fn load(&self, local: &LocalCache) -> Result<()> {
        let Some(rows) = local.loaded(&self.key) else {
            warn!(
                "Deferred load of {} for statement {} has no cached result",
                self.property, self.statement_id
            );
            return Ok(());
        };

        let value = match self.kind {
            TargetKind::Many => Value::List(rows.to_vec()),
            TargetKind::Single => match rows {
                [] => Value::Null,
                [row] => row.clone(),
                _ => {
                    return Err(CacheError::TooManyResults {
                        statement: self.statement_id.clone(),
                        count: rows.len(),
                    });
                }
            },
        };

        if !self.target.lock().set_property(&self.property, value) {
            warn!(
                "Deferred load target for {} is not a map, property {} left unset",
                self.statement_id, self.property
            );
        }
        Ok(())
    }
}
