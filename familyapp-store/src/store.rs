//! The row-store seam: CRUD + filtered query + per-owner change feed over
//! named tables of JSON rows.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::query::Query;
use crate::table::Table;

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert a row, generating an `id` when the row has none. Returns the
    /// stored row.
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Shallow-merge `patch` into the row with `id`. Returns the new row.
    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, table: Table, id: &str) -> Result<()>;

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Push feed of changes to `table` rows owned by `owner_id`.
    fn subscribe(&self, table: Table, owner_id: &str) -> Subscription;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub table: Table,
    pub kind: ChangeKind,
    pub owner_id: Option<String>,
    /// New row for insert/update, last known row for delete.
    pub row: Value,
}

impl RowChange {
    pub fn new(table: Table, kind: ChangeKind, row: Value) -> Self {
        let owner_id = row
            .get(table.owner_column())
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            table,
            kind,
            owner_id,
            row,
        }
    }
}

/// Broadcast side of the change feed, shared by the store implementations.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<RowChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, change: RowChange) {
        // no receivers is fine
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self, table: Table, owner_id: &str) -> Subscription {
        Subscription {
            table,
            owner_id: owner_id.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiving end of `RowStore::subscribe`.
pub struct Subscription {
    table: Table,
    owner_id: String,
    rx: broadcast::Receiver<RowChange>,
}

impl Subscription {
    /// Next matching change, or `None` once the store is dropped.
    pub async fn next(&mut self) -> Option<RowChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if change.table == self.table
                        && change.owner_id.as_deref() == Some(self.owner_id.as_str())
                    {
                        return Some(change);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(table = %self.table, skipped = n, "change feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Decode a stored row. Unknown enum values surface here as errors.
pub fn decode<T: DeserializeOwned>(table: Table, row: Value) -> Result<T> {
    serde_json::from_value(row).map_err(|source| StoreError::Decode { table, source })
}

pub fn encode<T: Serialize>(table: Table, value: &T) -> Result<Value> {
    let v = serde_json::to_value(value)?;
    if !v.is_object() {
        return Err(StoreError::InvalidRow {
            table,
            reason: "row must be a JSON object".to_string(),
        });
    }
    Ok(v)
}

pub async fn select_as<T: DeserializeOwned>(
    store: &dyn RowStore,
    table: Table,
    query: &Query,
) -> Result<Vec<T>> {
    store
        .select(table, query)
        .await?
        .into_iter()
        .map(|row| decode(table, row))
        .collect()
}

pub async fn get_as<T: DeserializeOwned>(
    store: &dyn RowStore,
    table: Table,
    id: &str,
) -> Result<T> {
    let mut rows = store.select(table, &Query::new().eq("id", id).limit(1)).await?;
    match rows.pop() {
        Some(row) => decode(table, row),
        None => Err(StoreError::NotFound {
            table,
            id: id.to_string(),
        }),
    }
}

/// Table mutations on an in-memory row vector, shared by the stores.
pub(crate) mod rows {
    use super::*;

    fn row_id(row: &Value) -> Option<&str> {
        row.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn insert(table: Table, rows: &mut Vec<Value>, row: Value) -> Result<Value> {
        let Value::Object(mut obj) = row else {
            return Err(StoreError::InvalidRow {
                table,
                reason: "row must be a JSON object".to_string(),
            });
        };

        let id = match obj.get("id").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        if rows.iter().any(|r| row_id(r) == Some(id.as_str())) {
            return Err(StoreError::Conflict { table, id });
        }
        obj.insert("id".to_string(), Value::String(id));

        let stored = Value::Object(obj);
        rows.push(stored.clone());
        Ok(stored)
    }

    pub fn update(table: Table, rows: &mut [Value], id: &str, patch: Value) -> Result<Value> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::InvalidRow {
                table,
                reason: "patch must be a JSON object".to_string(),
            });
        };
        let row = rows
            .iter_mut()
            .find(|r| row_id(r) == Some(id))
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })?;

        let obj: &mut Map<String, Value> =
            row.as_object_mut().ok_or_else(|| StoreError::InvalidRow {
                table,
                reason: format!("stored row {id} is not an object"),
            })?;
        for (k, v) in patch {
            if k != "id" {
                obj.insert(k, v);
            }
        }
        Ok(row.clone())
    }

    pub fn delete(table: Table, rows: &mut Vec<Value>, id: &str) -> Result<Value> {
        let pos = rows
            .iter()
            .position(|r| row_id(r) == Some(id))
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })?;
        Ok(rows.remove(pos))
    }
}
