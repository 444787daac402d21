use std::sync::Arc;

use chrono::{DateTime, Utc};
use familyapp_core::{Notification, NotificationDraft};
use familyapp_store::{decode, select_as, Query, RowStore, Subscription, Table};
use serde_json::json;
use tracing::debug;

use crate::error::{Result, ServiceResponse};
use crate::owner::OwnerId;
use crate::support::{fetch_owned, owned_row};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn RowStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        owner: &str,
        draft: NotificationDraft,
    ) -> ServiceResponse<Notification> {
        let r = match OwnerId::parse(owner) {
            Ok(owner) => self.create_at(&owner, draft, Utc::now()).await,
            Err(e) => Err(e),
        };
        ServiceResponse::from_result("notifications.create", r)
    }

    /// Newest first.
    pub async fn list(&self, owner: &str) -> ServiceResponse<Vec<Notification>> {
        let r = match OwnerId::parse(owner) {
            Ok(owner) => self.since(&owner, None).await,
            Err(e) => Err(e),
        };
        ServiceResponse::from_result("notifications.list", r)
    }

    pub async fn unread_count(&self, owner: &str) -> ServiceResponse<usize> {
        let r = self.try_unread(owner).await.map(|v| v.len());
        ServiceResponse::from_result("notifications.unread_count", r)
    }

    pub async fn mark_read(&self, owner: &str, id: &str) -> ServiceResponse<Notification> {
        ServiceResponse::from_result("notifications.mark_read", self.try_mark_read(owner, id).await)
    }

    /// Returns how many rows changed.
    pub async fn mark_all_read(&self, owner: &str) -> ServiceResponse<usize> {
        let r = self.try_mark_all_read(owner).await;
        ServiceResponse::from_result("notifications.mark_all_read", r)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> ServiceResponse<()> {
        ServiceResponse::from_result("notifications.delete", self.try_delete(owner, id).await)
    }

    /// Returns how many rows were removed.
    pub async fn delete_all(&self, owner: &str) -> ServiceResponse<usize> {
        ServiceResponse::from_result("notifications.delete_all", self.try_delete_all(owner).await)
    }

    /// Live feed of this owner's notification changes.
    pub fn watch(&self, owner: &str) -> ServiceResponse<Subscription> {
        let r = OwnerId::parse(owner)
            .map(|o| self.store.subscribe(Table::Notifications, o.as_str()));
        ServiceResponse::from_result("notifications.watch", r)
    }

    pub(crate) async fn create_at(
        &self,
        owner: &OwnerId,
        draft: NotificationDraft,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        draft.validate()?;
        let mut row = owned_row(Table::Notifications, owner, &draft)?;
        row["read"] = json!(false);
        row["created_at"] = json!(now);
        let n: Notification = decode(
            Table::Notifications,
            self.store.insert(Table::Notifications, row).await?,
        )?;
        debug!(owner = %owner, id = %n.id, title = %n.title, "notification created");
        Ok(n)
    }

    /// Owner's notifications created at or after `since`, newest first.
    pub(crate) async fn since(
        &self,
        owner: &OwnerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>> {
        let mut q = Query::new().eq("owner_id", owner.as_str());
        if let Some(since) = since {
            q = q.gte("created_at", json!(since));
        }
        let q = q.order_by("created_at", false);
        Ok(select_as(self.store.as_ref(), Table::Notifications, &q).await?)
    }

    async fn try_unread(&self, owner: &str) -> Result<Vec<Notification>> {
        let owner = OwnerId::parse(owner)?;
        let q = Query::new().eq("owner_id", owner.as_str()).eq("read", false);
        Ok(select_as(self.store.as_ref(), Table::Notifications, &q).await?)
    }

    async fn try_mark_read(&self, owner: &str, id: &str) -> Result<Notification> {
        let owner = OwnerId::parse(owner)?;
        let _: Notification =
            fetch_owned(self.store.as_ref(), Table::Notifications, &owner, id).await?;
        let row = self
            .store
            .update(Table::Notifications, id, json!({ "read": true }))
            .await?;
        Ok(decode(Table::Notifications, row)?)
    }

    async fn try_mark_all_read(&self, owner: &str) -> Result<usize> {
        let unread = self.try_unread(owner).await?;
        for n in &unread {
            self.store
                .update(Table::Notifications, &n.id, json!({ "read": true }))
                .await?;
        }
        Ok(unread.len())
    }

    async fn try_delete(&self, owner: &str, id: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let _: Notification =
            fetch_owned(self.store.as_ref(), Table::Notifications, &owner, id).await?;
        self.store.delete(Table::Notifications, id).await?;
        Ok(())
    }

    async fn try_delete_all(&self, owner: &str) -> Result<usize> {
        let owner = OwnerId::parse(owner)?;
        let all = self.since(&owner, None).await?;
        for n in &all {
            self.store.delete(Table::Notifications, &n.id).await?;
        }
        Ok(all.len())
    }
}
