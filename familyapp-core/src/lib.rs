//! familyapp-core: data model and pure logic for family budgets, tasks,
//! events and notifications.
//!
//! Nothing here performs I/O. Store-backed operations live in
//! `familyapp-services`.

pub mod aggregation;
pub mod budget;
pub mod dedup;
pub mod error;
pub mod event;
pub mod filter;
pub mod notification;
pub mod policy;
pub mod task;
pub mod time;

pub use aggregation::{
    expense_totals_by_category, monthly_trend, percent_change, percentage, recompute_spent,
    summarize_budgets, BudgetSummary, CategoryTotal, MonthlyTrend,
};
pub use budget::{Budget, BudgetCategory, BudgetDraft, BudgetPeriod, Expense, ExpenseDraft};
pub use dedup::{is_duplicate, DedupMode, DedupWindow, IdempotencyKey};
pub use error::CoreError;
pub use event::{Event, EventCategory, EventDraft};
pub use filter::{
    expense_view, filter_expenses, filter_tasks, sort_expenses, sort_tasks, task_view,
    CategoryFilter, DateRange, ExpenseFilter, ExpenseSortKey, SortOrder, SortState, StatusFilter,
    TaskFilter, TaskSortKey,
};
pub use notification::{Notification, NotificationCategory, NotificationDraft, NotificationKind};
pub use policy::{
    evaluate_budgets, evaluate_event, evaluate_task, Candidate, DueWindow, PolicyRule,
};
pub use task::{Task, TaskCategory, TaskDraft, TaskPriority};

/// Owner profile: the authenticated user every row belongs to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            timezone: default_timezone(),
        }
    }

    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = tz.into();
        self
    }
}
