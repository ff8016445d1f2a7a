use super::deferred::{DeferredLoad, TargetKind};
use super::local_cache::{LocalCache, LocalEntry};
use super::statement::{MappedStatement, Parameters};
use super::{Database, LocalCacheScope};
use crate::cache::{CacheKey, SharedCache, TransactionalCacheManager, compute_cache_key};
use crate::config::EngineConfig;
use crate::core::{CacheError, Result, RowBounds, Value};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Statement executor for one unit of work.
///
/// Owns the session-local cache and, when second-level caching is on, a
/// transactional view over every namespace cache it touches. Not meant to
/// be shared between threads.
pub struct Executor {
    database: Arc<dyn Database>,
    cache_enabled: bool,
    local_cache_scope: LocalCacheScope,
    environment_id: Option<String>,
    local_cache: LocalCache,
    deferred_loads: VecDeque<DeferredLoad>,
    query_stack: usize,
    pending_local_flush: bool,
    tcm: TransactionalCacheManager,
    closed: bool,
}

impl Executor {
    pub fn new(database: Arc<dyn Database>, config: &EngineConfig) -> Self {
        Self {
            database,
            cache_enabled: config.cache_enabled,
            local_cache_scope: config.local_cache_scope,
            environment_id: config.environment_id.clone(),
            local_cache: LocalCache::new(),
            deferred_loads: VecDeque::new(),
            query_stack: 0,
            pending_local_flush: false,
            tcm: TransactionalCacheManager::new(),
            closed: false,
        }
    }

    pub fn query(
        &mut self,
        ms: &MappedStatement,
        params: &mut Parameters,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let key = self.create_cache_key(ms, params, bounds);
        match ms.cache() {
            Some(cache) if self.cache_enabled => {
                self.query_through_shared_cache(cache, ms, params, bounds, key)
            }
            _ => self.query_local(ms, params, bounds, key),
        }
    }

    pub fn update(&mut self, ms: &MappedStatement, params: &Parameters) -> Result<u64> {
        self.ensure_open()?;
        if self.cache_enabled && ms.is_flush_cache_required() {
            if let Some(cache) = ms.cache() {
                self.tcm.clear(cache);
            }
        }
        self.flush_local_cache(ms);
        let count = self.database.update(ms, params)?;
        debug!("UPDATE statement={} rows={}", ms.id(), count);
        Ok(count)
    }

    pub fn create_cache_key(
        &self,
        ms: &MappedStatement,
        params: &Parameters,
        bounds: RowBounds,
    ) -> CacheKey {
        compute_cache_key(
            ms.id(),
            bounds,
            ms.sql(),
            &ms.bound_values(params),
            self.environment_id.as_deref(),
        )
    }

    /// Whether the local cache holds the key, loaded or still pending
    pub fn is_cached(&self, ms: &MappedStatement, params: &Parameters, bounds: RowBounds) -> bool {
        self.local_cache
            .contains(&self.create_cache_key(ms, params, bounds))
    }

    /// Assign the result of `ms` to `property` of `target`, now if it is
    /// already loaded, otherwise once the outermost query completes
    pub fn defer_load(
        &mut self,
        ms: &MappedStatement,
        params: &Parameters,
        bounds: RowBounds,
        target: Arc<Mutex<Value>>,
        property: &str,
        kind: TargetKind,
    ) -> Result<()> {
        self.ensure_open()?;
        let key = self.create_cache_key(ms, params, bounds);
        let load = DeferredLoad::new(target, property, key, kind, ms.id());
        if load.can_load(&self.local_cache) {
            load.load(&self.local_cache)
        } else {
            debug!("Deferring load of {} from statement={}", property, ms.id());
            self.deferred_loads.push_back(load);
            Ok(())
        }
    }

    /// Clear the local cache, publish buffered namespace writes and, when
    /// `required`, commit the connection
    pub fn commit(&mut self, required: bool) -> Result<()> {
        if self.closed {
            return Err(CacheError::ExecutorClosed);
        }
        self.clear_local_cache();
        if required {
            if let Err(e) = self.database.commit() {
                if let Err(cache_err) = self.tcm.rollback() {
                    warn!("Cache rollback after failed commit also failed: {}", cache_err);
                }
                return Err(e);
            }
        }
        self.tcm.commit()
    }

    /// Discard local and buffered namespace state. A no-op once closed.
    pub fn rollback(&mut self, required: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.clear_local_cache();
        self.deferred_loads.clear();
        let db_result = if required {
            self.database.rollback()
        } else {
            Ok(())
        };
        let cache_result = self.tcm.rollback();
        db_result.and(cache_result)
    }

    pub fn close(&mut self, force_rollback: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = if force_rollback {
            self.rollback(true)
        } else {
            self.clear_local_cache();
            self.tcm.commit()
        };
        self.deferred_loads.clear();
        self.closed = true;
        debug!("Executor closed (force_rollback={})", force_rollback);
        result
    }

    pub fn clear_local_cache(&mut self) {
        if !self.closed {
            self.local_cache.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn local_cache(&self) -> &LocalCache {
        &self.local_cache
    }

    /// Number of queries currently on the stack
    pub fn query_depth(&self) -> usize {
        self.query_stack
    }

    pub fn deferred_load_count(&self) -> usize {
        self.deferred_loads.len()
    }

    fn query_through_shared_cache(
        &mut self,
        cache: &SharedCache,
        ms: &MappedStatement,
        params: &mut Parameters,
        bounds: RowBounds,
        key: CacheKey,
    ) -> Result<Vec<Value>> {
        if ms.is_flush_cache_required() {
            debug!("Flushing cache={} for statement={}", cache.id(), ms.id());
            self.tcm.clear(cache);
        }
        if !ms.is_use_cache() {
            return self.query_local(ms, params, bounds, key);
        }

        self.ensure_no_out_params(ms)?;
        if let Some(Value::List(rows)) = self.tcm.get_object(cache, &key)? {
            debug!("Second level HIT cache={} statement={}", cache.id(), ms.id());
            return Ok(rows);
        }

        let rows = self.query_local(ms, params, bounds, key.clone())?;
        self.tcm.put_object(cache, key, Value::List(rows.clone()));
        Ok(rows)
    }

    fn query_local(
        &mut self,
        ms: &MappedStatement,
        params: &mut Parameters,
        bounds: RowBounds,
        key: CacheKey,
    ) -> Result<Vec<Value>> {
        if ms.is_flush_cache_required() {
            self.flush_local_cache(ms);
        }

        self.query_stack += 1;
        let result = match self.local_cache.get(&key) {
            Some(LocalEntry::Pending) => Err(CacheError::RecursiveQuery {
                statement: ms.id().to_string(),
                key: key.to_string(),
            }),
            Some(LocalEntry::Loaded(rows)) => {
                let rows = rows.clone();
                if ms.is_callable() {
                    self.restore_output_parameters(&key, params);
                }
                Ok(rows)
            }
            None => self.query_from_database(ms, params, bounds, key),
        };
        self.query_stack -= 1;

        if self.query_stack == 0 {
            let drained = if result.is_ok() {
                self.drain_deferred_loads()
            } else {
                self.deferred_loads.clear();
                Ok(())
            };
            if self.pending_local_flush || self.local_cache_scope == LocalCacheScope::Statement {
                self.pending_local_flush = false;
                self.clear_local_cache();
            }
            drained?;
        }
        result
    }

    fn query_from_database(
        &mut self,
        ms: &MappedStatement,
        params: &mut Parameters,
        bounds: RowBounds,
        key: CacheKey,
    ) -> Result<Vec<Value>> {
        self.local_cache.put_pending(key.clone());
        let database = Arc::clone(&self.database);
        let result = database.query(self, ms, params, bounds);
        self.local_cache.remove(&key);

        let rows = result?;
        debug!("SELECT statement={} rows={}", ms.id(), rows.len());
        self.local_cache.put_loaded(key.clone(), rows.clone());
        if ms.is_callable() {
            self.local_cache
                .put_output_parameters(key, ms.output_values(params));
        }
        Ok(rows)
    }

    /// Clear the local cache now, or once the outermost query completes
    /// when called from inside one
    fn flush_local_cache(&mut self, ms: &MappedStatement) {
        if self.query_stack == 0 {
            self.clear_local_cache();
        } else {
            debug!("Local flush for statement={} postponed until depth 0", ms.id());
            self.pending_local_flush = true;
        }
    }

    fn restore_output_parameters(&self, key: &CacheKey, params: &mut Parameters) {
        if let Some(outputs) = self.local_cache.output_parameters(key) {
            for (name, value) in outputs {
                params.insert(name.clone(), value.clone());
            }
        }
    }

    fn drain_deferred_loads(&mut self) -> Result<()> {
        let loads = std::mem::take(&mut self.deferred_loads);
        if !loads.is_empty() {
            debug!("Resolving {} deferred loads", loads.len());
        }
        for load in loads {
            load.load(&self.local_cache)?;
        }
        Ok(())
    }

    fn ensure_no_out_params(&self, ms: &MappedStatement) -> Result<()> {
        if ms.is_callable() && ms.has_out_params() {
            return Err(CacheError::OutParamsNotCacheable(ms.id().to_string()));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(CacheError::ExecutorClosed)
        } else {
            Ok(())
        }
    }
}
