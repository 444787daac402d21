use std::sync::Arc;

use chrono::NaiveDate;
use familyapp_core::{task_view, Task, TaskDraft, TaskFilter, TaskSortKey, SortState};
use familyapp_store::{decode, select_as, Query, RowStore, Table};
use serde_json::json;
use tracing::info;

use crate::error::{Result, ServiceResponse};
use crate::owner::OwnerId;
use crate::support::{fetch_owned, owned_row};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn RowStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner: &str, draft: TaskDraft) -> ServiceResponse<Task> {
        ServiceResponse::from_result("tasks.create", self.try_create(owner, draft).await)
    }

    pub async fn update(&self, owner: &str, id: &str, draft: TaskDraft) -> ServiceResponse<Task> {
        ServiceResponse::from_result("tasks.update", self.try_update(owner, id, draft).await)
    }

    pub async fn set_completed(
        &self,
        owner: &str,
        id: &str,
        completed: bool,
    ) -> ServiceResponse<Task> {
        ServiceResponse::from_result(
            "tasks.set_completed",
            self.try_set_completed(owner, id, Some(completed)).await,
        )
    }

    /// Flip the completed flag.
    pub async fn toggle(&self, owner: &str, id: &str) -> ServiceResponse<Task> {
        ServiceResponse::from_result("tasks.toggle", self.try_set_completed(owner, id, None).await)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> ServiceResponse<()> {
        ServiceResponse::from_result("tasks.delete", self.try_delete(owner, id).await)
    }

    pub async fn list(
        &self,
        owner: &str,
        filter: &TaskFilter,
        sort: SortState<TaskSortKey>,
        today: NaiveDate,
    ) -> ServiceResponse<Vec<Task>> {
        let r = self
            .try_all(owner)
            .await
            .map(|all| task_view(&all, filter, sort, today));
        ServiceResponse::from_result("tasks.list", r)
    }

    async fn try_all(&self, owner: &str) -> Result<Vec<Task>> {
        let owner = OwnerId::parse(owner)?;
        let q = Query::new()
            .eq("owner_id", owner.as_str())
            .order_by("due_date", true);
        Ok(select_as(self.store.as_ref(), Table::Tasks, &q).await?)
    }

    async fn try_create(&self, owner: &str, draft: TaskDraft) -> Result<Task> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;
        let mut row = owned_row(Table::Tasks, &owner, &draft)?;
        row["completed"] = json!(false);
        let task: Task = decode(Table::Tasks, self.store.insert(Table::Tasks, row).await?)?;
        info!(owner = %owner, id = %task.id, "task created");
        Ok(task)
    }

    async fn try_update(&self, owner: &str, id: &str, draft: TaskDraft) -> Result<Task> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;
        let _: Task = fetch_owned(self.store.as_ref(), Table::Tasks, &owner, id).await?;
        let patch = json!({
            "title": draft.title,
            "description": draft.description,
            "due_date": draft.due_date,
            "assigned_to": draft.assigned_to,
            "priority": draft.priority,
            "category": draft.category,
        });
        Ok(decode(Table::Tasks, self.store.update(Table::Tasks, id, patch).await?)?)
    }

    async fn try_set_completed(
        &self,
        owner: &str,
        id: &str,
        completed: Option<bool>,
    ) -> Result<Task> {
        let owner = OwnerId::parse(owner)?;
        let task: Task = fetch_owned(self.store.as_ref(), Table::Tasks, &owner, id).await?;
        let completed = completed.unwrap_or(!task.completed);
        let row = self
            .store
            .update(Table::Tasks, id, json!({ "completed": completed }))
            .await?;
        Ok(decode(Table::Tasks, row)?)
    }

    async fn try_delete(&self, owner: &str, id: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let _: Task = fetch_owned(self.store.as_ref(), Table::Tasks, &owner, id).await?;
        self.store.delete(Table::Tasks, id).await?;
        Ok(())
    }
}
