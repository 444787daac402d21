use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use familyapp_core::Profile;
use familyapp_services::{BatchReport, DedupScheduler, Job};
use std::time::Duration;
use tracing::{info, warn};

use crate::{take, App};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobArg {
    Tasks,
    Events,
    Budgets,
}

impl From<JobArg> for Job {
    fn from(j: JobArg) -> Self {
        match j {
            JobArg::Tasks => Job::Tasks,
            JobArg::Events => Job::Events,
            JobArg::Budgets => Job::Budgets,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    /// Evaluate reminders and write any that are not already sent
    Run {
        /// Restrict to these jobs (repeatable; default: all)
        #[arg(long = "job", value_enum)]
        jobs: Vec<JobArg>,

        /// Only the current owner instead of every profile
        #[arg(long, default_value_t = false)]
        owner_only: bool,

        /// Keep running, one tick every N seconds, until Ctrl-C
        #[arg(long)]
        every: Option<u64>,
    },

    /// List notifications, newest first
    List {
        #[arg(long, default_value_t = false)]
        unread: bool,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Number of unread notifications
    Count,

    /// Mark one notification (or --all) as read
    Read {
        id: Option<String>,

        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Delete one notification, or all of them when no id is given
    Clear { id: Option<String> },
}

pub async fn run(app: &App, cmd: NotifyCommand) -> Result<()> {
    match cmd {
        NotifyCommand::Run {
            jobs,
            owner_only,
            every,
        } => run_scheduler(app, jobs, owner_only, every).await,
        NotifyCommand::List { unread, limit } => list(app, unread, limit).await,
        NotifyCommand::Count => {
            let owner = app.owner()?;
            let n = take(app.services.notifications.unread_count(&owner).await)?;
            app.print(&n, || println!("{n} unread"))
        }
        NotifyCommand::Read { id, all } => read(app, id, all).await,
        NotifyCommand::Clear { id } => clear(app, id).await,
    }
}

async fn run_scheduler(
    app: &App,
    jobs: Vec<JobArg>,
    owner_only: bool,
    every: Option<u64>,
) -> Result<()> {
    let jobs: Vec<Job> = if jobs.is_empty() {
        Job::ALL.to_vec()
    } else {
        jobs.into_iter().map(Job::from).collect()
    };
    let scheduler = DedupScheduler::new(app.store.clone(), app.config.scheduler.clone());

    let Some(secs) = every else {
        return tick(app, &scheduler, &jobs, owner_only).await;
    };

    let mut interval = tokio::time::interval(Duration::from_secs(secs.max(1)));
    info!(every = secs, "notification loop started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = tick(app, &scheduler, &jobs, owner_only).await {
                    warn!(error = %e, "tick failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping notification loop");
                return Ok(());
            }
        }
    }
}

async fn tick(app: &App, scheduler: &DedupScheduler, jobs: &[Job], owner_only: bool) -> Result<()> {
    let now = Utc::now();

    let report = if owner_only {
        let owner = app.owner()?;
        let profiles = take(app.services.profiles.list().await)?;
        let profile = profiles
            .into_iter()
            .find(|p| p.id == owner)
            .unwrap_or_else(|| Profile::new(owner.clone()));
        let run = scheduler.run_owner_jobs(&profile, jobs, now).await?;
        BatchReport {
            runs: vec![run],
            failures: Vec::new(),
        }
    } else {
        scheduler.run_all_jobs(jobs, now).await.context("notification run")?
    };

    if app.json {
        println!("{}", serde_json::to_string_pretty(&report.runs)?);
    } else {
        for run in &report.runs {
            println!(
                "{}: {} new, {} already sent",
                run.owner_id,
                run.emitted.len(),
                run.skipped
            );
            for n in &run.emitted {
                println!("  [{}] {}: {}", n.kind.as_str(), n.title, n.message);
            }
        }
    }
    for f in &report.failures {
        eprintln!("failed: {f}");
    }
    Ok(())
}

async fn list(app: &App, unread: bool, limit: usize) -> Result<()> {
    let owner = app.owner()?;
    let rows: Vec<_> = take(app.services.notifications.list(&owner).await)?
        .into_iter()
        .filter(|n| !unread || !n.read)
        .take(limit)
        .collect();
    app.print(&rows, || {
        for n in &rows {
            let mark = if n.read { " " } else { "*" };
            println!(
                "{mark} {} | {} | {} | {}: {}",
                n.id,
                n.created_at.format("%Y-%m-%d %H:%M"),
                n.category.as_str(),
                n.title,
                n.message
            );
        }
    })
}

async fn read(app: &App, id: Option<String>, all: bool) -> Result<()> {
    let owner = app.owner()?;
    let notifications = &app.services.notifications;
    match (id, all) {
        (_, true) => {
            let n = take(notifications.mark_all_read(&owner).await)?;
            println!("Marked {n} read");
        }
        (Some(id), false) => {
            take(notifications.mark_read(&owner, &id).await)?;
            println!("Marked {id} read");
        }
        (None, false) => anyhow::bail!("pass a notification id or --all"),
    }
    Ok(())
}

async fn clear(app: &App, id: Option<String>) -> Result<()> {
    let owner = app.owner()?;
    let notifications = &app.services.notifications;
    match id {
        Some(id) => {
            take(notifications.delete(&owner, &id).await)?;
            println!("Deleted {id}");
        }
        None => {
            let n = take(notifications.delete_all(&owner).await)?;
            println!("Deleted {n} notifications");
        }
    }
    Ok(())
}
