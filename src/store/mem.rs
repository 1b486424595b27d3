// Scripted in-memory RowStore for handler unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{RowStore, StoreError};

/// Test double: queue up results in call order, then inspect the SQL the
/// handler issued.
#[derive(Default)]
pub struct MemStore {
    rows: Mutex<VecDeque<Vec<Value>>>,
    exec_results: Mutex<VecDeque<u64>>,
    pub calls: Mutex<Vec<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Value>) {
        self.rows.lock().unwrap().push_back(rows);
    }

    pub fn push_exec(&self, affected: u64) {
        self.exec_results.lock().unwrap().push_back(affected);
    }

    fn record(&self, sql: &str) {
        self.calls.lock().unwrap().push(sql.to_string());
    }
}

#[async_trait]
impl RowStore for MemStore {
    async fn fetch_all(&self, sql: &str, _params: &[Value]) -> Result<Vec<Value>, StoreError> {
        self.record(sql);
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        _params: &[Value],
    ) -> Result<Option<Value>, StoreError> {
        self.record(sql);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .pop_front()
            .and_then(|rows| rows.into_iter().next()))
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64, StoreError> {
        self.record(sql);
        Ok(self.exec_results.lock().unwrap().pop_front().unwrap_or(1))
    }
}
