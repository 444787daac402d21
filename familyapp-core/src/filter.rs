//! Search, date-range and category filtering plus multi-key sorting for
//! the expense and task lists.
//!
//! Filtering keeps input order; sorting is stable, so ties keep the
//! relative order they had going in.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::budget::{BudgetCategory, Expense};
use crate::error::{CoreError, Result};
use crate::task::{Task, TaskCategory};
use crate::time::{month_end, month_start};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    /// Today and the seven days before it.
    Week,
    /// Calendar month containing today, both ends inclusive.
    Month,
    /// January 1st of the current year through today.
    Year,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DateRange::All => true,
            DateRange::Week => date >= today - Duration::days(7) && date <= today,
            DateRange::Month => date >= month_start(today) && date <= month_end(today),
            DateRange::Year => {
                let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                date >= jan1 && date <= today
            }
        }
    }
}

impl FromStr for DateRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DateRange::All),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            "year" => Ok(DateRange::Year),
            _ => Err(CoreError::UnknownVariant {
                kind: "date range",
                value: s.to_string(),
            }),
        }
    }
}

/// `All`, or exact match on one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter<C> {
    All,
    Only(C),
}

impl<C> Default for CategoryFilter<C> {
    fn default() -> Self {
        CategoryFilter::All
    }
}

impl<C: PartialEq> CategoryFilter<C> {
    pub fn matches(&self, category: &C) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => c == category,
        }
    }
}

impl<C: FromStr<Err = CoreError>> FromStr for CategoryFilter<C> {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl FromStr for StatusFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            _ => Err(CoreError::UnknownVariant {
                kind: "status filter",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub search: String,
    pub date_range: DateRange,
    pub category: CategoryFilter<BudgetCategory>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub search: String,
    pub date_range: DateRange,
    pub category: CategoryFilter<TaskCategory>,
    pub status: StatusFilter,
}

/// Case-insensitive substring match against title or category label.
fn matches_search(title: &str, category: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    title.to_lowercase().contains(&term) || category.to_lowercase().contains(&term)
}

pub fn filter_expenses(
    expenses: &[Expense],
    filter: &ExpenseFilter,
    today: NaiveDate,
) -> Vec<Expense> {
    expenses
        .iter()
        .filter(|e| matches_search(&e.title, e.category.as_str(), &filter.search))
        .filter(|e| filter.date_range.contains(e.date, today))
        .filter(|e| filter.category.matches(&e.category))
        .cloned()
        .collect()
}

pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter, today: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| matches_search(&t.title, t.category.as_str(), &filter.search))
        .filter(|t| filter.date_range.contains(t.due_date, today))
        .filter(|t| filter.category.matches(&t.category))
        .filter(|t| match filter.status {
            StatusFilter::All => true,
            StatusFilter::Active => !t.completed,
            StatusFilter::Completed => t.completed,
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(CoreError::UnknownVariant {
                kind: "sort order",
                value: s.to_string(),
            }),
        }
    }
}

/// A sortable column. Each list has its own default direction.
pub trait SortKey: Copy + Eq {
    const DEFAULT_ORDER: SortOrder;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseSortKey {
    Date,
    Amount,
    Category,
}

impl SortKey for ExpenseSortKey {
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;
}

impl FromStr for ExpenseSortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(ExpenseSortKey::Date),
            "amount" => Ok(ExpenseSortKey::Amount),
            "category" => Ok(ExpenseSortKey::Category),
            _ => Err(CoreError::UnknownVariant {
                kind: "expense sort key",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSortKey {
    DueDate,
    Priority,
    Assignee,
}

impl SortKey for TaskSortKey {
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;
}

impl FromStr for TaskSortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duedate" | "due-date" | "due_date" => Ok(TaskSortKey::DueDate),
            "priority" => Ok(TaskSortKey::Priority),
            "assignee" => Ok(TaskSortKey::Assignee),
            _ => Err(CoreError::UnknownVariant {
                kind: "task sort key",
                value: s.to_string(),
            }),
        }
    }
}

/// Current column + direction, with click-to-toggle semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: K,
    pub order: SortOrder,
}

impl<K: SortKey> SortState<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            order: K::DEFAULT_ORDER,
        }
    }

    pub fn with_order(key: K, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Same key flips the direction; a different key resets to the default.
    pub fn select(&mut self, key: K) {
        if key == self.key {
            self.order = self.order.toggled();
        } else {
            self.key = key;
            self.order = K::DEFAULT_ORDER;
        }
    }
}

/// Case-insensitive comparison with a byte-order tiebreak.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn sort_expenses(expenses: &mut [Expense], sort: SortState<ExpenseSortKey>) {
    expenses.sort_by(|a, b| {
        let ord = match sort.key {
            ExpenseSortKey::Date => a.date.cmp(&b.date),
            ExpenseSortKey::Amount => a.amount.total_cmp(&b.amount),
            ExpenseSortKey::Category => locale_cmp(a.category.as_str(), b.category.as_str()),
        };
        sort.order.apply(ord)
    });
}

pub fn sort_tasks(tasks: &mut [Task], sort: SortState<TaskSortKey>) {
    tasks.sort_by(|a, b| {
        let ord = match sort.key {
            TaskSortKey::DueDate => a.due_date.cmp(&b.due_date),
            TaskSortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            TaskSortKey::Assignee => locale_cmp(&a.assigned_to, &b.assigned_to),
        };
        sort.order.apply(ord)
    });
}

/// Filter, then sort: what the expense list displays.
pub fn expense_view(
    expenses: &[Expense],
    filter: &ExpenseFilter,
    sort: SortState<ExpenseSortKey>,
    today: NaiveDate,
) -> Vec<Expense> {
    let mut out = filter_expenses(expenses, filter, today);
    sort_expenses(&mut out, sort);
    out
}

pub fn task_view(
    tasks: &[Task],
    filter: &TaskFilter,
    sort: SortState<TaskSortKey>,
    today: NaiveDate,
) -> Vec<Task> {
    let mut out = filter_tasks(tasks, filter, today);
    sort_tasks(&mut out, sort);
    out
}
