//! Periodic notification job.
//!
//! Each invocation re-evaluates every owner's tasks, upcoming events and
//! budget categories, and writes a notification for each policy hit that
//! has not already been emitted inside its dedup window. A store error
//! abandons the current owner; the next tick starts again from scratch.
//!
//! There is no claim or lock: two invocations running at the same time can
//! both pass the dedup check and write the same notification twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use familyapp_core::dedup::{validate_window_days, within_window};
use familyapp_core::time::{local_today, parse_timezone};
use familyapp_core::{
    evaluate_budgets, evaluate_event, evaluate_task, is_duplicate, summarize_budgets, Candidate,
    CoreError, DedupMode, DedupWindow, Notification, Profile, Task,
};
use familyapp_store::{select_as, Query, RowStore, Table};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::budgets::BudgetService;
use crate::error::{Result, ServiceError};
use crate::events::EventService;
use crate::notifications::NotificationService;
use crate::owner::OwnerId;
use crate::profiles::ProfileService;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler config: {0}")]
    Config(#[source] CoreError),

    #[error("listing profiles: {0}")]
    Profiles(#[source] ServiceError),

    #[error("owner {owner}: {source}")]
    Owner {
        owner: String,
        #[source]
        source: ServiceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
    Tasks,
    Events,
    Budgets,
}

impl Job {
    pub const ALL: [Job; 3] = [Job::Tasks, Job::Events, Job::Budgets];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub dedup_mode: DedupMode,
    /// Trailing window for budget alerts.
    pub budget_window_days: i64,
    /// Used when a profile's timezone does not parse.
    pub default_timezone: String,
}

impl SchedulerConfig {
    pub fn validate(&self) -> std::result::Result<(), CoreError> {
        validate_window_days(self.budget_window_days)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dedup_mode: DedupMode::MessageMatch,
            budget_window_days: 7,
            default_timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub owner_id: String,
    pub emitted: Vec<Notification>,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub runs: Vec<RunReport>,
    pub failures: Vec<SchedulerError>,
}

impl BatchReport {
    pub fn emitted(&self) -> usize {
        self.runs.iter().map(|r| r.emitted.len()).sum()
    }
}

pub struct DedupScheduler {
    store: Arc<dyn RowStore>,
    config: SchedulerConfig,
    profiles: ProfileService,
    budgets: BudgetService,
    events: EventService,
    notifications: NotificationService,
}

impl DedupScheduler {
    pub fn new(store: Arc<dyn RowStore>, config: SchedulerConfig) -> Self {
        Self {
            profiles: ProfileService::new(store.clone()),
            budgets: BudgetService::new(store.clone()),
            events: EventService::new(store.clone()),
            notifications: NotificationService::new(store.clone()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// One tick over every profile. A failing owner is recorded and skipped.
    pub async fn run_all(
        &self,
        now: DateTime<Utc>,
    ) -> std::result::Result<BatchReport, SchedulerError> {
        self.run_all_jobs(&Job::ALL, now).await
    }

    pub async fn run_all_jobs(
        &self,
        jobs: &[Job],
        now: DateTime<Utc>,
    ) -> std::result::Result<BatchReport, SchedulerError> {
        self.config.validate().map_err(SchedulerError::Config)?;
        let profiles = self.profiles.all().await.map_err(SchedulerError::Profiles)?;
        let mut report = BatchReport::default();

        for profile in &profiles {
            match self.run_owner_jobs(profile, jobs, now).await {
                Ok(run) => report.runs.push(run),
                Err(e) => {
                    warn!(error = %e, "owner skipped until next tick");
                    report.failures.push(e);
                }
            }
        }

        info!(
            owners = profiles.len(),
            emitted = report.emitted(),
            failed = report.failures.len(),
            "notification tick complete"
        );
        Ok(report)
    }

    pub async fn run_owner(
        &self,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> std::result::Result<RunReport, SchedulerError> {
        self.run_owner_jobs(profile, &Job::ALL, now).await
    }

    pub async fn run_owner_jobs(
        &self,
        profile: &Profile,
        jobs: &[Job],
        now: DateTime<Utc>,
    ) -> std::result::Result<RunReport, SchedulerError> {
        self.config.validate().map_err(SchedulerError::Config)?;
        self.try_run_owner(profile, jobs, now)
            .await
            .map_err(|source| SchedulerError::Owner {
                owner: profile.id.clone(),
                source,
            })
    }

    fn timezone_for(&self, profile: &Profile) -> Tz {
        parse_timezone(&profile.timezone)
            .or_else(|e| {
                warn!(owner = %profile.id, error = %e, "falling back to default timezone");
                parse_timezone(&self.config.default_timezone)
            })
            .unwrap_or(Tz::UTC)
    }

    async fn try_run_owner(
        &self,
        profile: &Profile,
        jobs: &[Job],
        now: DateTime<Utc>,
    ) -> Result<RunReport> {
        let owner = OwnerId::parse(&profile.id)?;
        let tz = self.timezone_for(profile);
        let today = local_today(now, tz);

        let mut candidates: Vec<Candidate> = Vec::new();
        for job in jobs {
            match job {
                Job::Tasks => {
                    let q = Query::new()
                        .eq("owner_id", owner.as_str())
                        .eq("completed", false);
                    let tasks: Vec<Task> = select_as(self.store.as_ref(), Table::Tasks, &q).await?;
                    candidates.extend(tasks.iter().filter_map(|t| evaluate_task(t, today)));
                }
                Job::Events => {
                    let events = self.events.upcoming_for(&owner, today).await?;
                    candidates.extend(events.iter().filter_map(|e| evaluate_event(e, today)));
                }
                Job::Budgets => {
                    let budgets = self.budgets.list_for(&owner).await?;
                    let summary = summarize_budgets(&budgets);
                    candidates.extend(evaluate_budgets(owner.as_str(), &summary));
                }
            }
        }

        let mut report = RunReport {
            owner_id: owner.to_string(),
            ..Default::default()
        };
        if candidates.is_empty() {
            return Ok(report);
        }

        // one load covering the widest window; narrowed per candidate below
        let same_day = DedupWindow::SameDay.since(now, tz)?;
        let trailing = DedupWindow::TrailingDays(self.config.budget_window_days).since(now, tz)?;
        let mut recent = self.notifications.since(&owner, Some(same_day.min(trailing))).await?;

        for candidate in candidates {
            let window = DedupWindow::for_rule(candidate.rule(), self.config.budget_window_days);
            let in_window = within_window(&recent, window.since(now, tz)?);
            if is_duplicate(self.config.dedup_mode, &candidate, &in_window) {
                debug!(owner = %owner, key = %candidate.key, "already notified");
                report.skipped += 1;
                continue;
            }

            let n = self.notifications.create_at(&owner, candidate.draft, now).await?;
            recent.push(n.clone());
            report.emitted.push(n);
        }

        info!(
            owner = %owner,
            emitted = report.emitted.len(),
            skipped = report.skipped,
            "owner evaluated"
        );
        Ok(report)
    }
}
