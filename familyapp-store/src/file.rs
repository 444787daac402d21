//! JSON-file row store: one `<table>.json` array per table under a data
//! directory. Writes go to a temp file and are renamed into place.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::query::Query;
use crate::store::{rows, ChangeFeed, ChangeKind, RowChange, RowStore, Subscription};
use crate::table::Table;

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
    feed: ChangeFeed,
}

impl JsonFileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            feed: ChangeFeed::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.json", table.name()))
    }

    async fn load(&self, table: Table) -> Result<Vec<Value>> {
        let path = self.table_path(table);
        match fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => Ok(Vec::new()),
            Ok(s) => {
                serde_json::from_str(&s).map_err(|source| StoreError::Decode { table, source })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, table: Table, rows: &[Value]) -> Result<()> {
        let path = self.table_path(table);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(rows)?;
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl RowStore for JsonFileStore {
    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let stored = {
            let _guard = self.lock.lock().await;
            let mut all = self.load(table).await?;
            let stored = rows::insert(table, &mut all, row)?;
            self.save(table, &all).await?;
            stored
        };
        debug!(%table, path = %self.table_path(table).display(), "insert");
        self.feed.publish(RowChange::new(table, ChangeKind::Insert, stored.clone()));
        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value> {
        let stored = {
            let _guard = self.lock.lock().await;
            let mut all = self.load(table).await?;
            let stored = rows::update(table, &mut all, id, patch)?;
            self.save(table, &all).await?;
            stored
        };
        self.feed.publish(RowChange::new(table, ChangeKind::Update, stored.clone()));
        Ok(stored)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<()> {
        let removed = {
            let _guard = self.lock.lock().await;
            let mut all = self.load(table).await?;
            let removed = rows::delete(table, &mut all, id)?;
            self.save(table, &all).await?;
            removed
        };
        self.feed.publish(RowChange::new(table, ChangeKind::Delete, removed));
        Ok(())
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let _guard = self.lock.lock().await;
        let all = self.load(table).await?;
        Ok(query.apply(all.iter()))
    }

    fn subscribe(&self, table: Table, owner_id: &str) -> Subscription {
        self.feed.subscribe(table, owner_id)
    }
}
