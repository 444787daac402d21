//! Budget roll-ups and spending trends.
//!
//! Everything here is a pure function of the slice it is handed; callers
//! pass a snapshot and may call as often as they like.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::budget::{normalize_amount, Budget, BudgetCategory, Expense};
use crate::time::{month_start, previous_month_start};

/// Per-category sums of budget targets and spending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub amount: f64,
    pub spent: f64,
}

impl CategoryTotal {
    pub fn percentage(&self) -> f64 {
        percentage(self.spent, self.amount)
    }

    pub fn remaining(&self) -> f64 {
        self.amount - self.spent
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
    pub category_totals: BTreeMap<BudgetCategory, CategoryTotal>,
}

/// `spent / amount * 100`, or 0 when there is nothing to divide by.
///
/// Never returns NaN or an infinity.
pub fn percentage(spent: f64, amount: f64) -> f64 {
    let spent = normalize_amount(spent);
    let amount = normalize_amount(amount);
    if amount > 0.0 {
        normalize_amount(spent / amount * 100.0)
    } else {
        0.0
    }
}

/// Totals and category roll-up for one owner's budgets, in a single pass.
pub fn summarize_budgets(budgets: &[Budget]) -> BudgetSummary {
    let mut summary = BudgetSummary::default();

    for b in budgets {
        let amount = normalize_amount(b.amount);
        let spent = normalize_amount(b.spent);

        summary.total_budget += amount;
        summary.total_spent += spent;

        let entry = summary.category_totals.entry(b.category).or_default();
        entry.amount += amount;
        entry.spent += spent;
    }

    summary.total_remaining = summary.total_budget - summary.total_spent;
    summary
}

/// Expense amounts rolled up by category.
pub fn expense_totals_by_category(expenses: &[Expense]) -> BTreeMap<BudgetCategory, f64> {
    let mut out = BTreeMap::new();
    for e in expenses {
        *out.entry(e.category).or_insert(0.0) += normalize_amount(e.amount);
    }
    out
}

/// Total of expenses dated within the given calendar month.
pub fn month_total(expenses: &[Expense], year: i32, month: u32) -> f64 {
    expenses
        .iter()
        .filter(|e| e.date.year() == year && e.date.month() == month)
        .map(|e| normalize_amount(e.amount))
        .sum()
}

/// Signed percent change from `previous` to `current`.
///
/// `None` when there is no previous spending to compare against.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    let current = normalize_amount(current);
    let previous = normalize_amount(previous);
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub current_total: f64,
    pub previous_total: f64,
    pub percent_change: Option<f64>,
}

/// Compare this calendar month's spending with last month's.
pub fn monthly_trend(expenses: &[Expense], today: NaiveDate) -> MonthlyTrend {
    let this_month = month_start(today);
    let last_month = previous_month_start(today);

    let current_total = month_total(expenses, this_month.year(), this_month.month());
    let previous_total = month_total(expenses, last_month.year(), last_month.month());

    MonthlyTrend {
        current_total,
        previous_total,
        percent_change: percent_change(current_total, previous_total),
    }
}

/// What `budget.spent` would be if rebuilt from the owner's expenses.
///
/// Matches on owner and category only; `budget.period` is not consulted,
/// mirroring how the running total is maintained on expense insert.
pub fn recompute_spent(budget: &Budget, expenses: &[Expense]) -> f64 {
    expenses
        .iter()
        .filter(|e| e.owner_id == budget.owner_id && e.category == budget.category)
        .map(|e| normalize_amount(e.amount))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetPeriod;

    fn budget(amount: f64, spent: f64, category: BudgetCategory) -> Budget {
        Budget {
            id: format!("b-{}", category),
            owner_id: "o1".into(),
            title: category.to_string(),
            amount,
            spent,
            category,
            period: BudgetPeriod::Monthly,
        }
    }

    fn expense(amount: f64, date: (i32, u32, u32), category: BudgetCategory) -> Expense {
        Expense {
            id: format!("e-{amount}"),
            owner_id: "o1".into(),
            title: "x".into(),
            amount,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category,
            notes: None,
            budget_applied: true,
        }
    }

    #[test]
    fn groceries_and_entertainment_scenario() {
        let s = summarize_budgets(&[
            budget(500.0, 320.0, BudgetCategory::Groceries),
            budget(200.0, 150.0, BudgetCategory::Entertainment),
        ]);
        assert_eq!(s.total_budget, 700.0);
        assert_eq!(s.total_spent, 470.0);
        assert_eq!(s.total_remaining, 230.0);
        assert_eq!(s.category_totals.len(), 2);
        assert_eq!(
            s.category_totals[&BudgetCategory::Groceries],
            CategoryTotal { amount: 500.0, spent: 320.0 }
        );
        assert_eq!(
            s.category_totals[&BudgetCategory::Entertainment],
            CategoryTotal { amount: 200.0, spent: 150.0 }
        );
    }

    #[test]
    fn empty_input_is_all_zero() {
        let s = summarize_budgets(&[]);
        assert_eq!(s.total_budget, 0.0);
        assert_eq!(s.total_spent, 0.0);
        assert_eq!(s.total_remaining, 0.0);
        assert!(s.category_totals.is_empty());
    }

    #[test]
    fn same_category_budgets_are_rolled_up() {
        let s = summarize_budgets(&[
            budget(100.0, 10.0, BudgetCategory::Dining),
            budget(50.0, 45.0, BudgetCategory::Dining),
            budget(80.0, 0.0, BudgetCategory::Savings),
        ]);
        let dining = s.category_totals[&BudgetCategory::Dining];
        assert_eq!(dining.amount, 150.0);
        assert_eq!(dining.spent, 55.0);
        assert!(!s.category_totals.contains_key(&BudgetCategory::Groceries));
    }

    #[test]
    fn non_finite_fields_count_as_zero() {
        let s = summarize_budgets(&[
            budget(f64::NAN, 10.0, BudgetCategory::Other),
            budget(100.0, f64::INFINITY, BudgetCategory::Other),
        ]);
        assert_eq!(s.total_budget, 100.0);
        assert_eq!(s.total_spent, 10.0);
    }

    #[test]
    fn percentage_never_divides_by_zero() {
        assert_eq!(percentage(50.0, 0.0), 0.0);
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(f64::NAN, 100.0), 0.0);
        assert_eq!(CategoryTotal { amount: 0.0, spent: 20.0 }.percentage(), 0.0);
        assert_eq!(percentage(45.0, 50.0), 90.0);
    }

    #[test]
    fn percent_change_needs_a_baseline() {
        assert_eq!(percent_change(100.0, 0.0), None);
        assert_eq!(percent_change(150.0, 100.0), Some(50.0));
        assert_eq!(percent_change(50.0, 100.0), Some(-50.0));
    }

    #[test]
    fn monthly_trend_compares_calendar_months() {
        let expenses = vec![
            expense(30.0, (2026, 10, 2), BudgetCategory::Groceries),
            expense(90.0, (2026, 10, 15), BudgetCategory::Dining),
            expense(80.0, (2026, 9, 30), BudgetCategory::Groceries),
            expense(999.0, (2025, 10, 3), BudgetCategory::Housing),
        ];
        let t = monthly_trend(&expenses, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(t.current_total, 120.0);
        assert_eq!(t.previous_total, 80.0);
        assert_eq!(t.percent_change, Some(50.0));
    }

    #[test]
    fn recompute_ignores_budget_period() {
        let b = budget(500.0, 0.0, BudgetCategory::Groceries);
        let expenses = vec![
            expense(30.0, (2026, 10, 2), BudgetCategory::Groceries),
            expense(20.0, (2024, 1, 2), BudgetCategory::Groceries),
            expense(70.0, (2026, 10, 2), BudgetCategory::Dining),
        ];
        assert_eq!(recompute_spent(&b, &expenses), 50.0);

        let by_cat = expense_totals_by_category(&expenses);
        assert_eq!(by_cat[&BudgetCategory::Groceries], 50.0);
        assert_eq!(by_cat[&BudgetCategory::Dining], 70.0);
    }
}
