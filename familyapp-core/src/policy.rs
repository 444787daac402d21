//! Notification policy: which reminder or alert a task, event or budget
//! category deserves on a given day.
//!
//! Message text must be a pure function of the entity and the day, because
//! the compatibility dedup mode compares messages byte for byte.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::aggregation::{BudgetSummary, CategoryTotal};
use crate::budget::BudgetCategory;
use crate::dedup::IdempotencyKey;
use crate::event::{Event, EventCategory};
use crate::notification::{NotificationCategory, NotificationDraft, NotificationKind};
use crate::task::{Task, TaskPriority};

pub const BUDGET_WARNING_PCT: f64 = 75.0;
pub const BUDGET_ALERT_PCT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyRule {
    TaskDueToday,
    TaskDueTomorrow,
    TaskOverdue,
    EventToday,
    EventTomorrow,
    BudgetWarning,
    BudgetAlert,
}

impl PolicyRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRule::TaskDueToday => "task-due-today",
            PolicyRule::TaskDueTomorrow => "task-due-tomorrow",
            PolicyRule::TaskOverdue => "task-overdue",
            PolicyRule::EventToday => "event-today",
            PolicyRule::EventTomorrow => "event-tomorrow",
            PolicyRule::BudgetWarning => "budget-warning",
            PolicyRule::BudgetAlert => "budget-alert",
        }
    }

    pub fn is_budget(&self) -> bool {
        matches!(self, PolicyRule::BudgetWarning | PolicyRule::BudgetAlert)
    }
}

/// Where a date falls relative to the owner's today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueWindow {
    Overdue,
    Today,
    Tomorrow,
    Later,
}

pub fn classify_due(date: NaiveDate, today: NaiveDate) -> DueWindow {
    if date == today {
        DueWindow::Today
    } else if date < today {
        DueWindow::Overdue
    } else if date == today + Duration::days(1) {
        DueWindow::Tomorrow
    } else {
        DueWindow::Later
    }
}

/// A notification the policy wants to emit, before dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub key: IdempotencyKey,
    pub draft: NotificationDraft,
}

impl Candidate {
    fn new(
        key: IdempotencyKey,
        title: &str,
        message: String,
        kind: NotificationKind,
        category: NotificationCategory,
    ) -> Self {
        let draft = NotificationDraft {
            title: title.to_string(),
            message,
            kind,
            category,
            dedup_key: Some(key.to_string()),
        };
        Self { key, draft }
    }

    pub fn rule(&self) -> PolicyRule {
        self.key.rule
    }
}

fn assignee_suffix(task: &Task) -> String {
    let name = task.assigned_to.trim();
    if name.is_empty() {
        String::new()
    } else {
        format!(" (assigned to {name})")
    }
}

/// Decide the reminder for one task. Completed tasks never emit.
pub fn evaluate_task(task: &Task, today: NaiveDate) -> Option<Candidate> {
    if task.completed {
        return None;
    }

    let high = task.priority == TaskPriority::High;
    let kind = if high { NotificationKind::Alert } else { NotificationKind::Reminder };
    let key = |rule| IdempotencyKey::new(&task.owner_id, &task.id, rule, today.to_string());

    let candidate = match classify_due(task.due_date, today) {
        DueWindow::Today => Candidate::new(
            key(PolicyRule::TaskDueToday),
            if high { "High Priority Task Reminder" } else { "Task Reminder" },
            format!("Task \"{}\" is due today{}.", task.title, assignee_suffix(task)),
            kind,
            NotificationCategory::Family,
        ),
        DueWindow::Tomorrow => Candidate::new(
            key(PolicyRule::TaskDueTomorrow),
            if high { "High Priority Task Due Tomorrow" } else { "Task Due Tomorrow" },
            format!("Task \"{}\" is due tomorrow{}.", task.title, assignee_suffix(task)),
            kind,
            NotificationCategory::Family,
        ),
        DueWindow::Overdue => Candidate::new(
            key(PolicyRule::TaskOverdue),
            "Overdue Task Alert",
            format!(
                "Task \"{}\" was due on {} and is still incomplete.",
                task.title, task.due_date
            ),
            NotificationKind::Alert,
            NotificationCategory::Family,
        ),
        DueWindow::Later => return None,
    };
    Some(candidate)
}

fn event_details(event: &Event) -> String {
    let mut out = String::new();
    if let Some(t) = event.time {
        out.push_str(&format!(" at {}", t.format("%H:%M")));
    }
    if let Some(loc) = event.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        out.push_str(&format!(" ({loc})"));
    }
    out
}

/// Decide the reminder for one event. Past events have no overdue branch.
pub fn evaluate_event(event: &Event, today: NaiveDate) -> Option<Candidate> {
    let appointment = event.category == EventCategory::Appointment;
    let kind = if appointment { NotificationKind::Alert } else { NotificationKind::Reminder };
    let key = |rule| IdempotencyKey::new(&event.owner_id, &event.id, rule, today.to_string());

    let candidate = match classify_due(event.date, today) {
        DueWindow::Today => Candidate::new(
            key(PolicyRule::EventToday),
            if appointment { "Appointment Today" } else { "Event Today" },
            format!("\"{}\" is today{}.", event.title, event_details(event)),
            kind,
            NotificationCategory::Calendar,
        ),
        DueWindow::Tomorrow => Candidate::new(
            key(PolicyRule::EventTomorrow),
            if appointment { "Appointment Tomorrow" } else { "Event Tomorrow" },
            format!("\"{}\" is tomorrow{}.", event.title, event_details(event)),
            kind,
            NotificationCategory::Calendar,
        ),
        DueWindow::Overdue | DueWindow::Later => return None,
    };
    Some(candidate)
}

/// Whole percent shown in budget messages. Truncated, so a category under
/// the alert threshold never reads as "90%".
pub fn shown_percent(pct: f64) -> i64 {
    // absorbs float noise such as 0.29 * 100 = 28.999999999999996
    (pct + 1e-9).floor() as i64
}

/// Threshold check for one category roll-up. The alert band shadows the
/// warning band: a category over 90% yields only the alert.
///
/// The band is picked from the shown percentage, so warning and alert
/// messages for the same category never share text.
pub fn evaluate_budget_category(
    owner_id: &str,
    category: BudgetCategory,
    total: &CategoryTotal,
) -> Option<Candidate> {
    if total.amount <= 0.0 {
        return None;
    }
    let shown = shown_percent(total.percentage());
    let (rule, title, kind) = if shown as f64 >= BUDGET_ALERT_PCT {
        (PolicyRule::BudgetAlert, "Budget Alert", NotificationKind::Alert)
    } else if shown as f64 >= BUDGET_WARNING_PCT {
        (PolicyRule::BudgetWarning, "Budget Warning", NotificationKind::Info)
    } else {
        return None;
    };

    Some(Candidate::new(
        IdempotencyKey::new(owner_id, category.as_str(), rule, shown.to_string()),
        title,
        format!("You have used {shown}% of your {category} budget."),
        kind,
        NotificationCategory::Budget,
    ))
}

pub fn evaluate_budgets(owner_id: &str, summary: &BudgetSummary) -> Vec<Candidate> {
    summary
        .category_totals
        .iter()
        .filter_map(|(cat, total)| evaluate_budget_category(owner_id, *cat, total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskCategory;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn task(due: NaiveDate, priority: TaskPriority) -> Task {
        Task {
            id: "t1".into(),
            owner_id: "o1".into(),
            title: "X".into(),
            description: None,
            due_date: due,
            assigned_to: String::new(),
            priority,
            completed: false,
            category: TaskCategory::Household,
        }
    }

    fn event(date: NaiveDate, category: EventCategory) -> Event {
        Event {
            id: "ev1".into(),
            owner_id: "o1".into(),
            title: "Dentist".into(),
            date,
            time: NaiveTime::from_hms_opt(9, 30, 0),
            location: Some("Main St Clinic".into()),
            description: None,
            category,
            attendees: vec![],
        }
    }

    #[test]
    fn high_priority_due_today_is_an_alert() {
        let c = evaluate_task(&task(today(), TaskPriority::High), today()).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Alert);
        assert_eq!(c.draft.title, "High Priority Task Reminder");
        assert_eq!(c.draft.message, "Task \"X\" is due today.");
        assert_eq!(c.rule(), PolicyRule::TaskDueToday);
    }

    #[test]
    fn normal_task_tomorrow_is_a_reminder() {
        let mut t = task(today() + Duration::days(1), TaskPriority::Low);
        t.assigned_to = "Sam".into();
        let c = evaluate_task(&t, today()).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Reminder);
        assert_eq!(c.draft.title, "Task Due Tomorrow");
        assert_eq!(c.draft.message, "Task \"X\" is due tomorrow (assigned to Sam).");
    }

    #[test]
    fn overdue_task_is_always_an_alert() {
        let overdue = task(today() - Duration::days(3), TaskPriority::Low);
        let c = evaluate_task(&overdue, today()).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Alert);
        assert_eq!(c.draft.title, "Overdue Task Alert");
        assert_eq!(
            c.draft.message,
            "Task \"X\" was due on 2026-10-16 and is still incomplete."
        );
    }

    #[test]
    fn completed_or_distant_tasks_emit_nothing() {
        let mut t = task(today(), TaskPriority::High);
        t.completed = true;
        assert!(evaluate_task(&t, today()).is_none());
        let distant = task(today() + Duration::days(2), TaskPriority::High);
        assert!(evaluate_task(&distant, today()).is_none());
    }

    #[test]
    fn messages_are_deterministic() {
        let t = task(today(), TaskPriority::Medium);
        assert_eq!(evaluate_task(&t, today()), evaluate_task(&t, today()));
    }

    #[test]
    fn appointments_alert_and_past_events_are_silent() {
        let c = evaluate_event(&event(today(), EventCategory::Appointment), today()).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Alert);
        assert_eq!(c.draft.title, "Appointment Today");
        assert_eq!(c.draft.message, "\"Dentist\" is today at 09:30 (Main St Clinic).");
        assert_eq!(c.draft.category, NotificationCategory::Calendar);

        let school = event(today() + Duration::days(1), EventCategory::School);
        let c = evaluate_event(&school, today()).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Reminder);
        assert_eq!(c.draft.title, "Event Tomorrow");

        let past = event(today() - Duration::days(1), EventCategory::Appointment);
        assert!(evaluate_event(&past, today()).is_none());
    }

    #[test]
    fn budget_thresholds_are_exclusive() {
        let hot = CategoryTotal { amount: 100.0, spent: 95.0 };
        let c = evaluate_budget_category("o1", BudgetCategory::Groceries, &hot).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Alert);
        assert_eq!(c.draft.message, "You have used 95% of your groceries budget.");

        let warm = CategoryTotal { amount: 200.0, spent: 150.0 };
        let c = evaluate_budget_category("o1", BudgetCategory::Dining, &warm).unwrap();
        assert_eq!(c.draft.kind, NotificationKind::Info);
        assert_eq!(c.rule(), PolicyRule::BudgetWarning);

        let cool = CategoryTotal { amount: 200.0, spent: 149.0 };
        assert!(evaluate_budget_category("o1", BudgetCategory::Dining, &cool).is_none());
        let empty = CategoryTotal { amount: 0.0, spent: 10.0 };
        assert!(evaluate_budget_category("o1", BudgetCategory::Dining, &empty).is_none());
    }

    #[test]
    fn budget_candidates_cover_every_crossed_category() {
        let mut summary = BudgetSummary::default();
        let totals = &mut summary.category_totals;
        totals.insert(BudgetCategory::Groceries, CategoryTotal { amount: 100.0, spent: 95.0 });
        totals.insert(BudgetCategory::Savings, CategoryTotal { amount: 100.0, spent: 5.0 });
        let out = evaluate_budgets("o1", &summary);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key.to_string(), "o1:groceries:budget-alert:95");
    }

    #[test]
    fn just_under_the_alert_line_reads_89() {
        let below = CategoryTotal { amount: 1000.0, spent: 896.0 };
        let warn = evaluate_budget_category("o1", BudgetCategory::Groceries, &below).unwrap();
        assert_eq!(warn.rule(), PolicyRule::BudgetWarning);
        assert_eq!(warn.draft.message, "You have used 89% of your groceries budget.");
        assert_eq!(warn.key.bucket, "89");

        let over = CategoryTotal { amount: 1000.0, spent: 902.0 };
        let alert = evaluate_budget_category("o1", BudgetCategory::Groceries, &over).unwrap();
        assert_eq!(alert.rule(), PolicyRule::BudgetAlert);
        assert_eq!(alert.draft.message, "You have used 90% of your groceries budget.");
        assert!(!alert.draft.message.contains(&warn.draft.message));
    }

    #[test]
    fn shown_percent_truncates() {
        assert_eq!(shown_percent(89.99), 89);
        assert_eq!(shown_percent(90.0), 90);
        assert_eq!(shown_percent(0.29 * 100.0), 29);
        assert_eq!(shown_percent(74.5), 74);
    }
}
