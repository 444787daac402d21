use std::sync::Arc;

use chrono::NaiveDate;
use familyapp_core::{Event, EventDraft};
use familyapp_store::{decode, encode, select_as, Query, RowStore, Table};
use tracing::info;

use crate::error::{Result, ServiceResponse};
use crate::owner::OwnerId;
use crate::support::{fetch_owned, owned_row};

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn RowStore>,
}

impl EventService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner: &str, draft: EventDraft) -> ServiceResponse<Event> {
        ServiceResponse::from_result("events.create", self.try_create(owner, draft).await)
    }

    pub async fn update(&self, owner: &str, id: &str, draft: EventDraft) -> ServiceResponse<Event> {
        ServiceResponse::from_result("events.update", self.try_update(owner, id, draft).await)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> ServiceResponse<()> {
        ServiceResponse::from_result("events.delete", self.try_delete(owner, id).await)
    }

    /// Events on or after `from`, soonest first.
    pub async fn upcoming(&self, owner: &str, from: NaiveDate) -> ServiceResponse<Vec<Event>> {
        ServiceResponse::from_result("events.upcoming", self.try_upcoming(owner, from).await)
    }

    pub(crate) async fn upcoming_for(
        &self,
        owner: &OwnerId,
        from: NaiveDate,
    ) -> Result<Vec<Event>> {
        let q = Query::new()
            .eq("owner_id", owner.as_str())
            .gte("date", from.to_string())
            .order_by("date", true);
        Ok(select_as(self.store.as_ref(), Table::Events, &q).await?)
    }

    async fn try_upcoming(&self, owner: &str, from: NaiveDate) -> Result<Vec<Event>> {
        self.upcoming_for(&OwnerId::parse(owner)?, from).await
    }

    async fn try_create(&self, owner: &str, draft: EventDraft) -> Result<Event> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;
        let row = owned_row(Table::Events, &owner, &draft)?;
        let event: Event = decode(Table::Events, self.store.insert(Table::Events, row).await?)?;
        info!(owner = %owner, id = %event.id, date = %event.date, "event created");
        Ok(event)
    }

    async fn try_update(&self, owner: &str, id: &str, draft: EventDraft) -> Result<Event> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;
        let _: Event = fetch_owned(self.store.as_ref(), Table::Events, &owner, id).await?;
        let mut patch = encode(Table::Events, &draft)?;
        // optional columns cleared by the edit must be cleared in the row too
        for col in ["time", "location", "description"] {
            if patch.get(col).is_none() {
                patch[col] = serde_json::Value::Null;
            }
        }
        Ok(decode(Table::Events, self.store.update(Table::Events, id, patch).await?)?)
    }

    async fn try_delete(&self, owner: &str, id: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let _: Event = fetch_owned(self.store.as_ref(), Table::Events, &owner, id).await?;
        self.store.delete(Table::Events, id).await?;
        Ok(())
    }
}
