//! Session Module
//!
//! `SessionFactory` holds the engine settings, registered statements and the
//! namespace caches. A `Session` is one unit of work on top of an
//! `Executor`; dropping it without `close` rolls back dirty work.

use crate::cache::SharedCache;
use crate::config::EngineConfig;
use crate::core::{CacheError, Result, RowBounds, Value};
use crate::executor::{Database, Executor, MappedStatement, Parameters};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct SessionFactory {
    config: EngineConfig,
    database: Arc<dyn Database>,
    caches: HashMap<String, SharedCache>,
    statements: HashMap<String, MappedStatement>,
}

impl SessionFactory {
    /// Build every configured namespace cache up front
    pub fn new(config: EngineConfig, database: Arc<dyn Database>) -> Result<Self> {
        let caches = config.build_caches()?;
        Ok(Self {
            config,
            database,
            caches,
            statements: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a cache built outside the configuration, replacing any
    /// cache with the same namespace id
    pub fn add_cache(&mut self, cache: SharedCache) {
        self.caches.insert(cache.id().to_string(), cache);
    }

    pub fn cache(&self, namespace: &str) -> Option<&SharedCache> {
        self.caches.get(namespace)
    }

    /// Register a statement. One without an explicit cache is bound to the
    /// cache of its namespace, if there is one.
    pub fn add_statement(&mut self, mut statement: MappedStatement) {
        if statement.cache().is_none() {
            let cache = self.caches.get(statement.namespace()).cloned();
            statement.set_cache(cache);
        }
        debug!(
            "Registered statement={} cache={:?}",
            statement.id(),
            statement.cache().map(|c| c.id())
        );
        self.statements.insert(statement.id().to_string(), statement);
    }

    pub fn statement(&self, id: &str) -> Option<&MappedStatement> {
        self.statements.get(id)
    }

    pub fn open_session(&self) -> Session<'_> {
        self.open_session_on(Arc::clone(&self.database), false)
    }

    pub fn open_session_with_auto_commit(&self, auto_commit: bool) -> Session<'_> {
        self.open_session_on(Arc::clone(&self.database), auto_commit)
    }

    /// Open a session on its own connection
    pub fn open_session_on(&self, database: Arc<dyn Database>, auto_commit: bool) -> Session<'_> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            factory: self,
            executor: Executor::new(database, &self.config),
            auto_commit,
            dirty: false,
            closed: false,
        };
        debug!("Opened session {} (auto_commit={})", session.id, auto_commit);
        session
    }
}

pub struct Session<'a> {
    id: String,
    factory: &'a SessionFactory,
    executor: Executor,
    auto_commit: bool,
    dirty: bool,
    closed: bool,
}

impl<'a> Session<'a> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn select_list(&mut self, statement: &str, params: &mut Parameters) -> Result<Vec<Value>> {
        self.select_list_with_bounds(statement, params, RowBounds::DEFAULT)
    }

    pub fn select_list_with_bounds(
        &mut self,
        statement: &str,
        params: &mut Parameters,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        let ms = self.mapped_statement(statement)?;
        self.executor.query(ms, params, bounds)
    }

    /// At most one row; more is an error
    pub fn select_one(&mut self, statement: &str, params: &mut Parameters) -> Result<Option<Value>> {
        let mut rows = self.select_list(statement, params)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(CacheError::TooManyResults {
                statement: statement.to_string(),
                count,
            }),
        }
    }

    pub fn update(&mut self, statement: &str, params: &Parameters) -> Result<u64> {
        let ms = self.mapped_statement(statement)?;
        self.dirty = true;
        self.executor.update(ms, params)
    }

    pub fn insert(&mut self, statement: &str, params: &Parameters) -> Result<u64> {
        self.update(statement, params)
    }

    pub fn delete(&mut self, statement: &str, params: &Parameters) -> Result<u64> {
        self.update(statement, params)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.commit_with(false)
    }

    /// Commit the connection even when nothing was written
    pub fn commit_force(&mut self) -> Result<()> {
        self.commit_with(true)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.rollback_with(false)
    }

    pub fn rollback_force(&mut self) -> Result<()> {
        self.rollback_with(true)
    }

    pub fn clear_cache(&mut self) {
        self.executor.clear_local_cache();
    }

    /// Settle the unit of work: dirty work is rolled back, cached reads are
    /// published
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let force_rollback = self.is_commit_or_rollback_required(false);
        let result = self.executor.close(force_rollback);
        self.dirty = false;
        self.closed = true;
        debug!("Closed session {}", self.id);
        result
    }

    fn commit_with(&mut self, force: bool) -> Result<()> {
        let required = self.is_commit_or_rollback_required(force);
        self.executor.commit(required)?;
        self.dirty = false;
        Ok(())
    }

    fn rollback_with(&mut self, force: bool) -> Result<()> {
        let required = self.is_commit_or_rollback_required(force);
        self.executor.rollback(required)?;
        self.dirty = false;
        Ok(())
    }

    fn is_commit_or_rollback_required(&self, force: bool) -> bool {
        (!self.auto_commit && self.dirty) || force
    }

    fn mapped_statement(&self, id: &str) -> Result<&'a MappedStatement> {
        self.factory
            .statement(id)
            .ok_or_else(|| CacheError::Execution(format!("unknown mapped statement {}", id)))
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Closing session {} on drop failed: {}", self.id, e);
        }
    }
}
