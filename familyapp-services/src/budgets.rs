use std::sync::Arc;

use familyapp_core::{summarize_budgets, Budget, BudgetDraft, BudgetSummary};
use familyapp_store::{decode, select_as, Query, RowStore, Table};
use serde_json::json;
use tracing::info;

use crate::error::{Result, ServiceResponse};
use crate::owner::OwnerId;
use crate::support::{fetch_owned, owned_row};

#[derive(Clone)]
pub struct BudgetService {
    store: Arc<dyn RowStore>,
}

impl BudgetService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner: &str, draft: BudgetDraft) -> ServiceResponse<Budget> {
        ServiceResponse::from_result("budgets.create", self.try_create(owner, draft).await)
    }

    pub async fn update(
        &self,
        owner: &str,
        id: &str,
        draft: BudgetDraft,
    ) -> ServiceResponse<Budget> {
        ServiceResponse::from_result("budgets.update", self.try_update(owner, id, draft).await)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> ServiceResponse<()> {
        ServiceResponse::from_result("budgets.delete", self.try_delete(owner, id).await)
    }

    pub async fn list(&self, owner: &str) -> ServiceResponse<Vec<Budget>> {
        ServiceResponse::from_result("budgets.list", self.try_list(owner).await)
    }

    pub async fn summary(&self, owner: &str) -> ServiceResponse<BudgetSummary> {
        ServiceResponse::from_result("budgets.summary", self.try_summary(owner).await)
    }

    async fn try_list(&self, owner: &str) -> Result<Vec<Budget>> {
        self.list_for(&OwnerId::parse(owner)?).await
    }

    async fn try_summary(&self, owner: &str) -> Result<BudgetSummary> {
        let budgets = self.list_for(&OwnerId::parse(owner)?).await?;
        Ok(summarize_budgets(&budgets))
    }

    pub(crate) async fn list_for(&self, owner: &OwnerId) -> Result<Vec<Budget>> {
        let q = Query::new()
            .eq("owner_id", owner.as_str())
            .order_by("title", true);
        Ok(select_as(self.store.as_ref(), Table::Budgets, &q).await?)
    }

    async fn try_create(&self, owner: &str, draft: BudgetDraft) -> Result<Budget> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;
        let row = owned_row(Table::Budgets, &owner, &draft)?;
        let stored = self.store.insert(Table::Budgets, row).await?;
        let budget: Budget = decode(Table::Budgets, stored)?;
        info!(owner = %owner, id = %budget.id, category = %budget.category, "budget created");
        Ok(budget)
    }

    async fn try_update(&self, owner: &str, id: &str, draft: BudgetDraft) -> Result<Budget> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;
        let _: Budget = fetch_owned(self.store.as_ref(), Table::Budgets, &owner, id).await?;
        let patch = json!({
            "title": draft.title,
            "amount": draft.amount,
            "spent": draft.spent,
            "category": draft.category,
            "period": draft.period,
        });
        let stored = self.store.update(Table::Budgets, id, patch).await?;
        Ok(decode(Table::Budgets, stored)?)
    }

    async fn try_delete(&self, owner: &str, id: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let _: Budget = fetch_owned(self.store.as_ref(), Table::Budgets, &owner, id).await?;
        self.store.delete(Table::Budgets, id).await?;
        info!(owner = %owner, id, "budget deleted");
        Ok(())
    }
}
