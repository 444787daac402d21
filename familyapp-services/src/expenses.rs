//! Expense writes and the budget running totals they feed.
//!
//! Adding an expense touches two tables. The store has no transactions, so
//! the write runs as a saga:
//!
//! 1. insert the expense with `budget_applied = false`
//! 2. add its amount to `spent` on every same-category budget of the owner
//! 3. flip `budget_applied` to true
//!
//! If step 2 or 3 fails, budgets already bumped are restored and the expense
//! row is removed. `reconcile` re-runs steps 2-3 for a row whose flag is
//! still false, so the increment is applied at most once.
//!
//! Deleting under `Recompute` runs the same steps backwards: clear the flag,
//! subtract from the budgets, then remove the row. A retry after a failed
//! row delete finds the flag cleared and does not subtract again.
//!
//! Budget `period` is not consulted when matching; every same-category
//! budget is bumped regardless of the expense date.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use familyapp_core::budget::normalize_amount;
use familyapp_core::{
    expense_totals_by_category, expense_view, monthly_trend, Budget, BudgetCategory, Expense,
    ExpenseDraft, ExpenseFilter, ExpenseSortKey, MonthlyTrend, SortState,
};
use familyapp_store::{decode, select_as, Query, RowStore, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{Result, ServiceResponse};
use crate::owner::OwnerId;
use crate::support::{fetch_owned, owned_row};

/// What deleting an expense does to the budgets it was added to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpenseDeletePolicy {
    /// Leave `spent` untouched.
    #[default]
    LeaveStale,
    /// Subtract the amount from every same-category budget.
    Recompute,
}

/// A budget whose `spent` was changed, and what it was before.
struct Bump {
    budget_id: String,
    previous_spent: f64,
}

#[derive(Clone)]
pub struct ExpenseService {
    store: Arc<dyn RowStore>,
    delete_policy: ExpenseDeletePolicy,
}

impl ExpenseService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            delete_policy: ExpenseDeletePolicy::default(),
        }
    }

    pub fn with_delete_policy(mut self, policy: ExpenseDeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub async fn add(&self, owner: &str, draft: ExpenseDraft) -> ServiceResponse<Expense> {
        ServiceResponse::from_result("expenses.add", self.try_add(owner, draft).await)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> ServiceResponse<()> {
        ServiceResponse::from_result("expenses.delete", self.try_delete(owner, id).await)
    }

    pub async fn reconcile(&self, owner: &str, id: &str) -> ServiceResponse<Expense> {
        ServiceResponse::from_result("expenses.reconcile", self.try_reconcile(owner, id).await)
    }

    /// Filtered, sorted expense list as displayed.
    pub async fn list(
        &self,
        owner: &str,
        filter: &ExpenseFilter,
        sort: SortState<ExpenseSortKey>,
        today: NaiveDate,
    ) -> ServiceResponse<Vec<Expense>> {
        let r = self
            .try_all(owner)
            .await
            .map(|all| expense_view(&all, filter, sort, today));
        ServiceResponse::from_result("expenses.list", r)
    }

    pub async fn trend(&self, owner: &str, today: NaiveDate) -> ServiceResponse<MonthlyTrend> {
        let r = self.try_all(owner).await.map(|all| monthly_trend(&all, today));
        ServiceResponse::from_result("expenses.trend", r)
    }

    pub async fn totals_by_category(
        &self,
        owner: &str,
    ) -> ServiceResponse<BTreeMap<BudgetCategory, f64>> {
        let r = self.try_all(owner).await.map(|all| expense_totals_by_category(&all));
        ServiceResponse::from_result("expenses.totals_by_category", r)
    }

    async fn try_all(&self, owner: &str) -> Result<Vec<Expense>> {
        let owner = OwnerId::parse(owner)?;
        let q = Query::new()
            .eq("owner_id", owner.as_str())
            .order_by("date", false);
        Ok(select_as(self.store.as_ref(), Table::Expenses, &q).await?)
    }

    async fn try_add(&self, owner: &str, draft: ExpenseDraft) -> Result<Expense> {
        let owner = OwnerId::parse(owner)?;
        draft.validate()?;

        let mut row = owned_row(Table::Expenses, &owner, &draft)?;
        row["budget_applied"] = Value::Bool(false);
        let inserted = self.store.insert(Table::Expenses, row).await?;
        let expense: Expense = decode(Table::Expenses, inserted)?;

        match self.apply_to_budgets(&owner, &expense).await {
            Ok(applied) => {
                info!(
                    owner = %owner,
                    id = %expense.id,
                    category = %expense.category,
                    "expense added"
                );
                Ok(applied)
            }
            Err(e) => {
                if let Err(undo) = self.store.delete(Table::Expenses, &expense.id).await {
                    warn!(
                        id = %expense.id,
                        error = %undo,
                        "could not remove expense after failed budget update"
                    );
                }
                Err(e)
            }
        }
    }

    async fn try_reconcile(&self, owner: &str, id: &str) -> Result<Expense> {
        let owner = OwnerId::parse(owner)?;
        let expense: Expense = fetch_owned(self.store.as_ref(), Table::Expenses, &owner, id).await?;
        if expense.budget_applied {
            return Ok(expense);
        }
        self.apply_to_budgets(&owner, &expense).await
    }

    /// Steps 2-3 of the saga; restores touched budgets on failure.
    async fn apply_to_budgets(&self, owner: &OwnerId, expense: &Expense) -> Result<Expense> {
        let budgets = self.matching_budgets(owner, expense.category).await?;
        let amount = normalize_amount(expense.amount);

        let mut bumped: Vec<Bump> = Vec::with_capacity(budgets.len());
        for b in budgets {
            let patch = json!({ "spent": b.spent + amount });
            match self.store.update(Table::Budgets, &b.id, patch).await {
                Ok(_) => bumped.push(Bump {
                    budget_id: b.id,
                    previous_spent: b.spent,
                }),
                Err(e) => {
                    self.restore(&bumped).await;
                    return Err(e.into());
                }
            }
        }

        match self
            .store
            .update(Table::Expenses, &expense.id, json!({ "budget_applied": true }))
            .await
        {
            Ok(row) => Ok(decode(Table::Expenses, row)?),
            Err(e) => {
                self.restore(&bumped).await;
                Err(e.into())
            }
        }
    }

    /// Clear `budget_applied`, then subtract the amount from every
    /// same-category budget. Restores both on failure.
    async fn reverse_from_budgets(&self, owner: &OwnerId, expense: &Expense) -> Result<()> {
        self.store
            .update(Table::Expenses, &expense.id, json!({ "budget_applied": false }))
            .await?;

        let amount = normalize_amount(expense.amount);
        let budgets = match self.matching_budgets(owner, expense.category).await {
            Ok(b) => b,
            Err(e) => {
                self.mark_applied(&expense.id).await;
                return Err(e);
            }
        };

        let mut touched: Vec<Bump> = Vec::with_capacity(budgets.len());
        for b in budgets {
            let patch = json!({ "spent": (b.spent - amount).max(0.0) });
            match self.store.update(Table::Budgets, &b.id, patch).await {
                Ok(_) => touched.push(Bump {
                    budget_id: b.id,
                    previous_spent: b.spent,
                }),
                Err(e) => {
                    self.restore(&touched).await;
                    self.mark_applied(&expense.id).await;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    async fn mark_applied(&self, id: &str) {
        let patch = json!({ "budget_applied": true });
        if let Err(e) = self.store.update(Table::Expenses, id, patch).await {
            warn!(id, error = %e, "could not restore budget_applied");
        }
    }

    async fn restore(&self, bumped: &[Bump]) {
        for b in bumped {
            let patch = json!({ "spent": b.previous_spent });
            if let Err(e) = self.store.update(Table::Budgets, &b.budget_id, patch).await {
                warn!(budget = %b.budget_id, error = %e, "could not restore budget spent");
            }
        }
    }

    async fn matching_budgets(
        &self,
        owner: &OwnerId,
        category: BudgetCategory,
    ) -> Result<Vec<Budget>> {
        let q = Query::new()
            .eq("owner_id", owner.as_str())
            .eq("category", category.as_str());
        Ok(select_as(self.store.as_ref(), Table::Budgets, &q).await?)
    }

    async fn try_delete(&self, owner: &str, id: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let expense: Expense = fetch_owned(self.store.as_ref(), Table::Expenses, &owner, id).await?;

        if self.delete_policy == ExpenseDeletePolicy::Recompute && expense.budget_applied {
            self.reverse_from_budgets(&owner, &expense).await?;
        }

        self.store.delete(Table::Expenses, id).await?;
        info!(owner = %owner, id, policy = ?self.delete_policy, "expense deleted");
        Ok(())
    }
}
