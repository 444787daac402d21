use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;
use familyapp_core::event::parse_time;
use familyapp_core::{
    CategoryFilter, DateRange, EventCategory, EventDraft, SortOrder, SortState, StatusFilter,
    TaskCategory, TaskDraft, TaskFilter, TaskPriority, TaskSortKey,
};

use crate::{take, App};

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task
    Add {
        #[arg(long)]
        title: String,

        /// YYYY-MM-DD
        #[arg(long)]
        due: NaiveDate,

        #[arg(long, default_value = "medium")]
        priority: TaskPriority,

        #[arg(long, default_value = "other")]
        category: TaskCategory,

        /// Family member responsible
        #[arg(long)]
        assignee: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List tasks
    List {
        #[arg(long, default_value = "")]
        search: String,

        #[arg(long, default_value = "all")]
        range: DateRange,

        #[arg(long)]
        category: Option<TaskCategory>,

        /// all, active or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// due-date, priority or assignee
        #[arg(long, default_value = "due-date")]
        sort: TaskSortKey,

        /// asc or desc (default: asc)
        #[arg(long)]
        order: Option<SortOrder>,
    },

    /// Mark a task completed
    Done { id: String },

    /// Flip a task between completed and active
    Toggle { id: String },

    /// Delete a task
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum EventCommand {
    /// Create an event
    Add {
        #[arg(long)]
        title: String,

        /// YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        /// HH:MM
        #[arg(long, value_parser = parse_time_arg)]
        time: Option<NaiveTime>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, default_value = "other")]
        category: EventCategory,

        /// Repeat for each attendee
        #[arg(long = "attendee")]
        attendees: Vec<String>,
    },

    /// Events from today (or --from) onward
    List {
        #[arg(long)]
        from: Option<NaiveDate>,
    },

    /// Delete an event
    Delete { id: String },
}

fn parse_time_arg(s: &str) -> Result<NaiveTime, String> {
    parse_time(s).map_err(|e| e.to_string())
}

pub async fn run_task(app: &App, cmd: TaskCommand) -> Result<()> {
    let owner = app.owner()?;
    let tasks = &app.services.tasks;

    match cmd {
        TaskCommand::Add {
            title,
            due,
            priority,
            category,
            assignee,
            description,
        } => {
            let mut draft = TaskDraft::new(title, due)
                .with_priority(priority)
                .with_category(category);
            if let Some(name) = assignee {
                draft = draft.with_assignee(name);
            }
            draft.description = description;
            let t = take(tasks.create(&owner, draft).await)?;
            app.print(&t, || println!("Created task {} due {} ({})", t.title, t.due_date, t.id))?;
        }
        TaskCommand::List {
            search,
            range,
            category,
            status,
            sort,
            order,
        } => {
            let filter = TaskFilter {
                search,
                date_range: range,
                category: category.map_or(CategoryFilter::All, CategoryFilter::Only),
                status,
            };
            let sort = match order {
                Some(o) => SortState::with_order(sort, o),
                None => SortState::new(sort),
            };
            let today = app.today(&owner).await?;
            let rows = take(tasks.list(&owner, &filter, sort, today).await)?;
            app.print(&rows, || {
                for t in &rows {
                    let mark = if t.completed { "x" } else { " " };
                    println!(
                        "[{mark}] {} | {} | {} | {} | {}",
                        t.id,
                        t.due_date,
                        t.priority.as_str(),
                        t.title,
                        t.assigned_to
                    );
                }
            })?;
        }
        TaskCommand::Done { id } => {
            let t = take(tasks.set_completed(&owner, &id, true).await)?;
            app.print(&t, || println!("Completed {}", t.title))?;
        }
        TaskCommand::Toggle { id } => {
            let t = take(tasks.toggle(&owner, &id).await)?;
            app.print(&t, || println!("{} completed: {}", t.title, t.completed))?;
        }
        TaskCommand::Delete { id } => {
            take(tasks.delete(&owner, &id).await)?;
            println!("Deleted task {id}");
        }
    }
    Ok(())
}

pub async fn run_event(app: &App, cmd: EventCommand) -> Result<()> {
    let owner = app.owner()?;
    let events = &app.services.events;

    match cmd {
        EventCommand::Add {
            title,
            date,
            time,
            location,
            description,
            category,
            attendees,
        } => {
            let mut draft = EventDraft::new(title, date, category);
            draft.time = time;
            draft.location = location;
            draft.description = description;
            draft.attendees = attendees;
            let e = take(events.create(&owner, draft).await)?;
            app.print(&e, || println!("Created event {} on {} ({})", e.title, e.date, e.id))?;
        }
        EventCommand::List { from } => {
            let from = match from {
                Some(d) => d,
                None => app.today(&owner).await?,
            };
            let rows = take(events.upcoming(&owner, from).await)?;
            app.print(&rows, || {
                for e in &rows {
                    let time = e.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
                    println!(
                        "{} | {} {} | {} | {} | {}",
                        e.id,
                        e.date,
                        time,
                        e.category,
                        e.title,
                        e.location.as_deref().unwrap_or("")
                    );
                }
            })?;
        }
        EventCommand::Delete { id } => {
            take(events.delete(&owner, &id).await)?;
            println!("Deleted event {id}");
        }
    }
    Ok(())
}
