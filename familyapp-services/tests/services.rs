mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{FlakyStore, Op};
use familyapp_core::{
    BudgetCategory, BudgetDraft, BudgetPeriod, CategoryFilter, DateRange, EventCategory,
    EventDraft, ExpenseDraft, ExpenseFilter, ExpenseSortKey, NotificationCategory,
    NotificationDraft, NotificationKind, SortState, TaskDraft, TaskFilter, TaskPriority,
    TaskSortKey,
};
use familyapp_store::{MemoryStore, RowStore, Table};
use familyapp_services::{ExpenseDeletePolicy, Services};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn budget(title: &str, amount: f64, category: BudgetCategory) -> BudgetDraft {
    BudgetDraft {
        title: title.into(),
        amount,
        spent: 0.0,
        category,
        period: BudgetPeriod::Monthly,
    }
}

fn expense(title: &str, amount: f64, date: NaiveDate, category: BudgetCategory) -> ExpenseDraft {
    ExpenseDraft {
        title: title.into(),
        amount,
        date,
        category,
        notes: None,
    }
}

#[tokio::test]
async fn missing_owner_is_auth_required() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    let r = svc.budgets.create("  ", budget("Food", 100.0, BudgetCategory::Groceries)).await;
    assert!(r.data.is_none());
    assert!(r.error.unwrap().contains("sign-in required"));
}

#[tokio::test]
async fn validation_errors_come_back_as_strings() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    let r = svc.budgets.create("o1", budget("", 100.0, BudgetCategory::Groceries)).await;
    assert_eq!(r.error.as_deref(), Some("missing required field: title"));
}

#[tokio::test]
async fn summary_matches_scenario() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    let mut g = budget("Food", 500.0, BudgetCategory::Groceries);
    g.spent = 320.0;
    let mut e = budget("Fun", 200.0, BudgetCategory::Entertainment);
    e.spent = 150.0;
    assert!(svc.budgets.create("o1", g).await.is_ok());
    assert!(svc.budgets.create("o1", e).await.is_ok());
    assert!(svc.budgets.create("o2", budget("Other", 999.0, BudgetCategory::Other)).await.is_ok());

    let s = svc.budgets.summary("o1").await.into_result().unwrap();
    assert_eq!(s.total_budget, 700.0);
    assert_eq!(s.total_spent, 470.0);
    assert_eq!(s.total_remaining, 230.0);
    assert_eq!(s.category_totals.len(), 2);
}

#[tokio::test]
async fn adding_an_expense_bumps_same_category_budgets_once() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    svc.budgets
        .create("o1", budget("Food", 500.0, BudgetCategory::Groceries))
        .await
        .into_result()
        .unwrap();
    // yearly budget in the same category is bumped too
    let mut yearly = budget("Food (year)", 5000.0, BudgetCategory::Groceries);
    yearly.period = BudgetPeriod::Yearly;
    svc.budgets.create("o1", yearly).await.into_result().unwrap();
    svc.budgets
        .create("o1", budget("Fun", 200.0, BudgetCategory::Entertainment))
        .await
        .into_result()
        .unwrap();

    let e = svc
        .expenses
        .add("o1", expense("Weekly shop", 80.0, d(2026, 10, 18), BudgetCategory::Groceries))
        .await
        .into_result()
        .unwrap();
    assert!(e.budget_applied);

    // reconcile is a no-op once applied
    svc.expenses.reconcile("o1", &e.id).await.into_result().unwrap();

    let budgets = svc.budgets.list("o1").await.into_result().unwrap();
    for b in &budgets {
        match b.category {
            BudgetCategory::Groceries => assert_eq!(b.spent, 80.0, "{}", b.title),
            _ => assert_eq!(b.spent, 0.0),
        }
    }
}

#[tokio::test]
async fn failed_budget_update_rolls_back_the_expense() {
    let store = Arc::new(FlakyStore::new());
    let svc = Services::new(store.clone(), ExpenseDeletePolicy::default());
    svc.budgets
        .create("o1", budget("A", 100.0, BudgetCategory::Dining))
        .await
        .into_result()
        .unwrap();
    svc.budgets
        .create("o1", budget("B", 100.0, BudgetCategory::Dining))
        .await
        .into_result()
        .unwrap();

    // first budget bump succeeds, second fails
    store.fail_after(Table::Budgets, Op::Update, 1);
    let r = svc
        .expenses
        .add("o1", expense("Pizza", 30.0, d(2026, 10, 2), BudgetCategory::Dining))
        .await;
    assert!(r.error.unwrap().contains("injected"));

    store.heal();
    let budgets = svc.budgets.list("o1").await.into_result().unwrap();
    assert!(budgets.iter().all(|b| b.spent == 0.0));
    assert_eq!(store.inner.len(Table::Expenses).await, 0);
}

#[tokio::test]
async fn delete_policy_controls_spent() {
    for (policy, expected) in [
        (ExpenseDeletePolicy::LeaveStale, 45.0),
        (ExpenseDeletePolicy::Recompute, 0.0),
    ] {
        let svc = Services::new(Arc::new(MemoryStore::new()), policy);
        svc.budgets
            .create("o1", budget("Bills", 300.0, BudgetCategory::Utilities))
            .await
            .into_result()
            .unwrap();
        let e = svc
            .expenses
            .add("o1", expense("Water", 45.0, d(2026, 10, 5), BudgetCategory::Utilities))
            .await
            .into_result()
            .unwrap();
        assert!(svc.expenses.delete("o1", &e.id).await.is_ok());

        let b = &svc.budgets.list("o1").await.into_result().unwrap()[0];
        assert_eq!(b.spent, expected, "{policy:?}");
    }
}

#[tokio::test]
async fn retried_delete_subtracts_only_once() {
    let store = Arc::new(FlakyStore::new());
    let svc = Services::new(store.clone(), ExpenseDeletePolicy::Recompute);
    svc.budgets
        .create("o1", budget("Food", 200.0, BudgetCategory::Groceries))
        .await
        .into_result()
        .unwrap();
    let mut ids = Vec::new();
    for title in ["Market", "Bakery"] {
        let e = svc
            .expenses
            .add("o1", expense(title, 50.0, d(2026, 10, 4), BudgetCategory::Groceries))
            .await
            .into_result()
            .unwrap();
        ids.push(e.id);
    }

    store.fail_after(Table::Expenses, Op::Delete, 0);
    let first = svc.expenses.delete("o1", &ids[0]).await;
    assert!(first.error.unwrap().contains("injected"));
    assert!(svc.expenses.delete("o1", &ids[0]).await.is_ok());

    let b = &svc.budgets.list("o1").await.into_result().unwrap()[0];
    assert_eq!(b.spent, 50.0);
    assert_eq!(store.inner.len(Table::Expenses).await, 1);
}

#[tokio::test]
async fn failed_budget_decrement_is_rolled_back() {
    let store = Arc::new(FlakyStore::new());
    let svc = Services::new(store.clone(), ExpenseDeletePolicy::Recompute);
    for title in ["A", "B"] {
        svc.budgets
            .create("o1", budget(title, 100.0, BudgetCategory::Dining))
            .await
            .into_result()
            .unwrap();
    }
    let e = svc
        .expenses
        .add("o1", expense("Pizza", 30.0, d(2026, 10, 2), BudgetCategory::Dining))
        .await
        .into_result()
        .unwrap();

    // first decrement succeeds, second fails
    store.fail_after(Table::Budgets, Op::Update, 1);
    assert!(svc.expenses.delete("o1", &e.id).await.error.is_some());

    let budgets = svc.budgets.list("o1").await.into_result().unwrap();
    assert!(budgets.iter().all(|b| b.spent == 30.0));
    let kept = svc.expenses.reconcile("o1", &e.id).await.into_result().unwrap();
    assert!(kept.budget_applied);

    assert!(svc.expenses.delete("o1", &e.id).await.is_ok());
    let budgets = svc.budgets.list("o1").await.into_result().unwrap();
    assert!(budgets.iter().all(|b| b.spent == 0.0));
}

#[tokio::test]
async fn expense_list_applies_filters_and_sort() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    for (t, amt, date, cat) in [
        ("Shop", 80.0, d(2026, 10, 18), BudgetCategory::Groceries),
        ("Cinema", 24.0, d(2026, 10, 3), BudgetCategory::Entertainment),
        ("Market", 30.0, d(2026, 9, 28), BudgetCategory::Groceries),
    ] {
        svc.expenses.add("o1", expense(t, amt, date, cat)).await.into_result().unwrap();
    }

    let filter = ExpenseFilter {
        search: String::new(),
        date_range: DateRange::Month,
        category: CategoryFilter::All,
    };
    let got = svc
        .expenses
        .list("o1", &filter, SortState::new(ExpenseSortKey::Amount), d(2026, 10, 19))
        .await
        .into_result()
        .unwrap();
    let titles: Vec<_> = got.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Shop", "Cinema"]);

    let trend = svc.expenses.trend("o1", d(2026, 10, 19)).await.into_result().unwrap();
    assert_eq!(trend.current_total, 104.0);
    assert_eq!(trend.previous_total, 30.0);
}

#[tokio::test]
async fn other_owners_rows_are_not_found() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    let t = svc
        .tasks
        .create("o1", TaskDraft::new("Pack lunches", d(2026, 10, 20)))
        .await
        .into_result()
        .unwrap();
    let r = svc.tasks.delete("o2", &t.id).await;
    assert!(r.error.unwrap().contains("not found"));
    assert!(svc.tasks.delete("o1", &t.id).await.is_ok());
}

#[tokio::test]
async fn task_toggle_and_list() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    let a = svc
        .tasks
        .create("o1", TaskDraft::new("Laundry", d(2026, 10, 21)).with_priority(TaskPriority::Low))
        .await
        .into_result()
        .unwrap();
    svc.tasks
        .create(
            "o1",
            TaskDraft::new("Permission slip", d(2026, 10, 20)).with_priority(TaskPriority::High),
        )
        .await
        .into_result()
        .unwrap();

    let toggled = svc.tasks.toggle("o1", &a.id).await.into_result().unwrap();
    assert!(toggled.completed);
    let again = svc.tasks.toggle("o1", &a.id).await.into_result().unwrap();
    assert!(!again.completed);

    let list = svc
        .tasks
        .list("o1", &TaskFilter::default(), SortState::new(TaskSortKey::Priority), d(2026, 10, 19))
        .await
        .into_result()
        .unwrap();
    let titles: Vec<_> = list.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Laundry", "Permission slip"]);
}

#[tokio::test]
async fn event_update_clears_optional_fields() {
    let svc = Services::new(Arc::new(MemoryStore::new()), ExpenseDeletePolicy::default());
    let mut draft = EventDraft::new("Dentist", d(2026, 10, 22), EventCategory::Appointment);
    draft.location = Some("Clinic".into());
    let ev = svc.events.create("o1", draft.clone()).await.into_result().unwrap();
    assert_eq!(ev.location.as_deref(), Some("Clinic"));

    draft.location = None;
    let ev = svc.events.update("o1", &ev.id, draft).await.into_result().unwrap();
    assert_eq!(ev.location, None);

    let upcoming = svc.events.upcoming("o1", d(2026, 10, 23)).await.into_result().unwrap();
    assert!(upcoming.is_empty());
}

#[tokio::test]
async fn notification_read_state() {
    let store: Arc<dyn RowStore> = Arc::new(MemoryStore::new());
    let svc = Services::new(store, ExpenseDeletePolicy::default());
    let draft = NotificationDraft {
        title: "Welcome".into(),
        message: "Thanks for joining.".into(),
        kind: NotificationKind::Info,
        category: NotificationCategory::System,
        dedup_key: None,
    };
    let n = svc.notifications.create("o1", draft.clone()).await.into_result().unwrap();
    svc.notifications.create("o1", draft.clone()).await.into_result().unwrap();
    svc.notifications.create("o2", draft).await.into_result().unwrap();

    assert_eq!(svc.notifications.unread_count("o1").await.data, Some(2));
    svc.notifications.mark_read("o1", &n.id).await.into_result().unwrap();
    assert_eq!(svc.notifications.unread_count("o1").await.data, Some(1));
    assert_eq!(svc.notifications.mark_all_read("o1").await.data, Some(1));
    assert_eq!(svc.notifications.unread_count("o1").await.data, Some(0));
    assert_eq!(svc.notifications.delete_all("o1").await.data, Some(2));
    assert_eq!(svc.notifications.list("o2").await.data.map(|v| v.len()), Some(1));
}
