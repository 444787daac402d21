#![allow(dead_code)]

use async_trait::async_trait;
use familyapp_store::{MemoryStore, Query, RowStore, StoreError, Subscription, Table};
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Insert,
    Update,
    Delete,
    Select,
}

/// MemoryStore that can be told to fail a specific operation.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    // (table, op, calls to let through before failing)
    fail: Mutex<Option<(Table, Op, usize)>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `(skip + 1)`-th matching call once; later calls pass.
    pub fn fail_after(&self, table: Table, op: Op, skip: usize) {
        *self.fail.lock().unwrap() = Some((table, op, skip));
    }

    pub fn heal(&self) {
        *self.fail.lock().unwrap() = None;
    }

    fn check(&self, table: Table, op: Op) -> Result<(), StoreError> {
        let mut guard = self.fail.lock().unwrap();
        if let Some((t, o, remaining)) = guard.as_mut() {
            if *t == table && *o == op {
                if *remaining == 0 {
                    *guard = None;
                    let msg = format!("injected {op:?} failure on {table}");
                    return Err(StoreError::Unavailable(msg));
                }
                *remaining -= 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RowStore for FlakyStore {
    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        self.check(table, Op::Insert)?;
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        self.check(table, Op::Update)?;
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.check(table, Op::Delete)?;
        self.inner.delete(table, id).await
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.check(table, Op::Select)?;
        self.inner.select(table, query).await
    }

    fn subscribe(&self, table: Table, owner_id: &str) -> Subscription {
        self.inner.subscribe(table, owner_id)
    }
}
