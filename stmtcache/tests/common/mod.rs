// Shared helpers for integration tests
#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use stmtcache::{
    Database, Executor, MappedStatement, ParameterMapping, Parameters, Result, RowBounds,
    SqlCommandType, Value,
};

/// In-memory table that filters rows by the `id` parameter when present
pub struct TableDatabase {
    rows: Mutex<Vec<Value>>,
    delay: Duration,
    pub queries: AtomicUsize,
    pub updates: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

impl TableDatabase {
    pub fn new(rows: Vec<Value>) -> Arc<Self> {
        Self::with_delay(rows, Duration::ZERO)
    }

    pub fn with_delay(rows: Vec<Value>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            delay,
            queries: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        })
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl Database for TableDatabase {
    fn query(
        &self,
        _executor: &mut Executor,
        _statement: &MappedStatement,
        params: &mut Parameters,
        _bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let rows = self.rows.lock();
        Ok(match params.get("id") {
            Some(id) => rows
                .iter()
                .filter(|row| row.get("id") == Some(id))
                .cloned()
                .collect(),
            None => rows.clone(),
        })
    }

    fn update(&self, _statement: &MappedStatement, params: &Parameters) -> Result<u64> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock();
        let mut changed = 0;
        if let (Some(id), Some(name)) = (params.get("id"), params.get("name")) {
            for row in rows.iter_mut().filter(|row| row.get("id") == Some(id)) {
                row.set_property("name", name.clone());
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn user(id: i64, name: &str) -> Value {
    Value::map().with("id", id).with("name", name)
}

pub fn users() -> Vec<Value> {
    vec![user(1, "ann"), user(2, "bob"), user(3, "cy")]
}

pub fn by_id(id: i64) -> Parameters {
    let mut params = Parameters::new();
    params.insert("id".to_string(), Value::Int(id));
    params
}

pub fn find_user() -> MappedStatement {
    MappedStatement::builder(
        "users.find",
        "SELECT * FROM users WHERE id = ?",
        SqlCommandType::Select,
    )
    .parameter(ParameterMapping::input("id"))
    .build()
}

pub fn all_users() -> MappedStatement {
    MappedStatement::builder("users.all", "SELECT * FROM users", SqlCommandType::Select).build()
}

pub fn rename_user() -> MappedStatement {
    MappedStatement::builder(
        "users.rename",
        "UPDATE users SET name = ? WHERE id = ?",
        SqlCommandType::Update,
    )
    .parameter(ParameterMapping::input("name"))
    .parameter(ParameterMapping::input("id"))
    .build()
}
