//! In-process row store. Used by tests and as the reference behaviour for
//! other adapters.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::query::Query;
use crate::store::{rows, ChangeFeed, ChangeKind, RowChange, RowStore, Subscription};
use crate::table::Table;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in `table`.
    pub async fn len(&self, table: Table) -> usize {
        self.tables.lock().await.get(&table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let stored = {
            let mut tables = self.tables.lock().await;
            rows::insert(table, tables.entry(table).or_default(), row)?
        };
        debug!(%table, id = stored["id"].as_str().unwrap_or_default(), "insert");
        self.feed.publish(RowChange::new(table, ChangeKind::Insert, stored.clone()));
        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value> {
        let stored = {
            let mut tables = self.tables.lock().await;
            rows::update(table, tables.entry(table).or_default(), id, patch)?
        };
        debug!(%table, id, "update");
        self.feed.publish(RowChange::new(table, ChangeKind::Update, stored.clone()));
        Ok(stored)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<()> {
        let removed = {
            let mut tables = self.tables.lock().await;
            rows::delete(table, tables.entry(table).or_default(), id)?
        };
        debug!(%table, id, "delete");
        self.feed.publish(RowChange::new(table, ChangeKind::Delete, removed));
        Ok(())
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let tables = self.tables.lock().await;
        Ok(match tables.get(&table) {
            Some(rows) => query.apply(rows.iter()),
            None => Vec::new(),
        })
    }

    fn subscribe(&self, table: Table, owner_id: &str) -> Subscription {
        self.feed.subscribe(table, owner_id)
    }
}
