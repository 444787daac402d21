//! Duplicate suppression for scheduled notifications.
//!
//! `MessageMatch` reproduces the long-standing behaviour: a candidate is
//! dropped when a recent notification's message equals or contains the
//! candidate's message. Renaming a task therefore defeats it.
//! `IdempotencyKey` compares `owner:entity:rule:bucket` keys instead.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::notification::Notification;
use crate::policy::{Candidate, PolicyRule};
use crate::time::{local_day_start_utc, local_today};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupMode {
    #[default]
    MessageMatch,
    IdempotencyKey,
}

impl FromStr for DedupMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "message-match" | "message" => Ok(DedupMode::MessageMatch),
            "idempotency-key" | "key" => Ok(DedupMode::IdempotencyKey),
            _ => Err(CoreError::UnknownVariant {
                kind: "dedup mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub owner_id: String,
    pub entity_id: String,
    pub rule: PolicyRule,
    /// Local date for tasks/events, shown percentage for budgets.
    pub bucket: String,
}

impl IdempotencyKey {
    pub fn new(owner_id: &str, entity_id: &str, rule: PolicyRule, bucket: String) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            entity_id: entity_id.to_string(),
            rule,
            bucket,
        }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.owner_id,
            self.entity_id,
            self.rule.as_str(),
            self.bucket
        )
    }
}

/// How far back existing notifications are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupWindow {
    /// Since the start of the owner's current calendar day.
    SameDay,
    TrailingDays(i64),
}

impl DedupWindow {
    pub fn for_rule(rule: PolicyRule, budget_days: i64) -> Self {
        if rule.is_budget() {
            DedupWindow::TrailingDays(budget_days)
        } else {
            DedupWindow::SameDay
        }
    }

    /// Start of the window ending at `now`. A negative or out-of-range day
    /// count is an error rather than a window starting in the future.
    pub fn since(&self, now: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>> {
        match self {
            DedupWindow::SameDay => Ok(local_day_start_utc(local_today(now, tz), tz)),
            DedupWindow::TrailingDays(days) => {
                let start = (*days >= 0)
                    .then(|| TimeDelta::try_days(*days))
                    .flatten()
                    .and_then(|d| now.checked_sub_signed(d));
                start.ok_or_else(|| invalid_window(*days))
            }
        }
    }
}

/// Longest trailing window accepted from configuration.
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Reject window lengths that are negative or unreasonably long.
pub fn validate_window_days(days: i64) -> Result<()> {
    if (0..=MAX_WINDOW_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(invalid_window(days))
    }
}

fn invalid_window(days: i64) -> CoreError {
    CoreError::InvalidField {
        field: "budget_window_days",
        reason: format!("must be between 0 and {MAX_WINDOW_DAYS}, got {days}"),
    }
}

/// Whether `candidate` was already emitted among `recent`, which the caller
/// has restricted to the relevant window.
pub fn is_duplicate(mode: DedupMode, candidate: &Candidate, recent: &[Notification]) -> bool {
    match mode {
        DedupMode::MessageMatch => {
            let msg = candidate.draft.message.as_str();
            recent
                .iter()
                .any(|n| n.message == msg || n.message.contains(msg))
        }
        DedupMode::IdempotencyKey => {
            let key = candidate.key.to_string();
            recent
                .iter()
                .any(|n| n.dedup_key.as_deref() == Some(key.as_str()))
        }
    }
}

/// Notifications created at or after `since`.
pub fn within_window(notifications: &[Notification], since: DateTime<Utc>) -> Vec<Notification> {
    notifications
        .iter()
        .filter(|n| n.created_at >= since)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotificationCategory, NotificationKind};
    use crate::policy::evaluate_task;
    use crate::task::{Task, TaskCategory, TaskPriority};
    use crate::time::parse_timezone;
    use chrono::{NaiveDate, TimeZone};

    fn task(title: &str) -> Task {
        Task {
            id: "t1".into(),
            owner_id: "o1".into(),
            title: title.into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            assigned_to: String::new(),
            priority: TaskPriority::Medium,
            completed: false,
            category: TaskCategory::School,
        }
    }

    fn stored(c: &Candidate) -> Notification {
        Notification {
            id: "n1".into(),
            owner_id: "o1".into(),
            title: c.draft.title.clone(),
            message: c.draft.message.clone(),
            kind: c.draft.kind,
            category: c.draft.category,
            read: false,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
            dedup_key: c.draft.dedup_key.clone(),
        }
    }

    #[test]
    fn both_modes_agree_on_unchanged_data() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let c = evaluate_task(&task("Sign form"), today).unwrap();
        let recent = vec![stored(&c)];
        assert!(is_duplicate(DedupMode::MessageMatch, &c, &recent));
        assert!(is_duplicate(DedupMode::IdempotencyKey, &c, &recent));
        assert!(!is_duplicate(DedupMode::MessageMatch, &c, &[]));
    }

    #[test]
    fn renaming_defeats_message_match_only() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let before = evaluate_task(&task("Sign form"), today).unwrap();
        let after = evaluate_task(&task("Sign permission form"), today).unwrap();
        let recent = vec![stored(&before)];
        assert!(!is_duplicate(DedupMode::MessageMatch, &after, &recent));
        assert!(is_duplicate(DedupMode::IdempotencyKey, &after, &recent));
    }

    #[test]
    fn message_match_accepts_containing_messages() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let c = evaluate_task(&task("Sign form"), today).unwrap();
        let mut n = stored(&c);
        n.message = format!("[digest] {}", c.draft.message);
        n.kind = NotificationKind::Info;
        n.category = NotificationCategory::System;
        assert!(is_duplicate(DedupMode::MessageMatch, &c, &[n]));
    }

    #[test]
    fn windows() {
        let tz = parse_timezone("America/Chicago").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
        // October is CDT (UTC-5)
        assert_eq!(
            DedupWindow::SameDay.since(now, tz).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 19, 5, 0, 0).unwrap()
        );
        assert_eq!(
            DedupWindow::for_rule(PolicyRule::BudgetAlert, 7).since(now, tz).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 12, 15, 0, 0).unwrap()
        );
        assert_eq!(DedupWindow::for_rule(PolicyRule::TaskOverdue, 7), DedupWindow::SameDay);
    }

    #[test]
    fn mode_parses_short_names() {
        assert_eq!("key".parse::<DedupMode>().unwrap(), DedupMode::IdempotencyKey);
        assert_eq!(DedupMode::default(), DedupMode::MessageMatch);
    }

    #[test]
    fn bad_window_lengths_are_errors() {
        let tz = parse_timezone("UTC").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
        assert!(DedupWindow::TrailingDays(1_000_000_000).since(now, tz).is_err());
        assert!(DedupWindow::TrailingDays(-1).since(now, tz).is_err());
        assert_eq!(DedupWindow::TrailingDays(0).since(now, tz).unwrap(), now);

        assert!(validate_window_days(7).is_ok());
        assert!(validate_window_days(-3).is_err());
        assert!(validate_window_days(MAX_WINDOW_DAYS + 1).is_err());
    }
}
