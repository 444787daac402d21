use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use familyapp_core::time::{local_today, parse_timezone};
use familyapp_core::Profile;
use familyapp_services::{ServiceResponse, Services};
use familyapp_store::{JsonFileStore, RowStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod budget_cmd;
mod config;
mod notify_cmd;
mod state;
mod task_cmd;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "familyapp", version, about = "Family budgets, tasks, events and notifications")]
struct Cli {
    /// Profile id to act as (default: config [cli].default_owner)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config.toml under ~/.familyapp
    Init,

    /// Budgets and their running totals
    Budget {
        #[command(subcommand)]
        command: budget_cmd::BudgetCommand,
    },

    /// Expenses, which feed budget totals
    Expense {
        #[command(subcommand)]
        command: budget_cmd::ExpenseCommand,
    },

    /// Family tasks
    Task {
        #[command(subcommand)]
        command: task_cmd::TaskCommand,
    },

    /// Calendar events
    Event {
        #[command(subcommand)]
        command: task_cmd::EventCommand,
    },

    /// Notifications and the reminder job
    Notify {
        #[command(subcommand)]
        command: notify_cmd::NotifyCommand,
    },

    /// Owner profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Create or update the current owner's profile
    Set {
        #[arg(long)]
        name: Option<String>,

        /// IANA timezone, e.g. America/Chicago
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },

    /// List every profile
    List,
}

/// Everything a subcommand needs.
pub struct App {
    pub config: Config,
    pub store: Arc<dyn RowStore>,
    pub services: Services,
    owner_flag: Option<String>,
    pub json: bool,
}

impl App {
    async fn open(
        cli_owner: Option<String>,
        data_dir: Option<PathBuf>,
        json: bool,
    ) -> Result<Self> {
        let config = config::load_config()?;
        let dir = match data_dir {
            Some(d) => d,
            None => config.data_dir()?,
        };
        debug!(dir = %dir.display(), "opening store");
        let store: Arc<dyn RowStore> = Arc::new(
            JsonFileStore::open(&dir)
                .await
                .with_context(|| format!("open store at {}", dir.display()))?,
        );
        let services = Services::new(store.clone(), config.expenses.delete_policy);
        Ok(Self {
            config,
            store,
            services,
            owner_flag: cli_owner,
            json,
        })
    }

    pub fn owner(&self) -> Result<String> {
        self.config.resolve_owner(self.owner_flag.clone())
    }

    /// Today in the owner's timezone, falling back to the scheduler default.
    pub async fn today(&self, owner: &str) -> Result<NaiveDate> {
        let profiles = take(self.services.profiles.list().await)?;
        let tz_name = profiles
            .iter()
            .find(|p| p.id == owner)
            .map(|p| p.timezone.as_str())
            .unwrap_or(self.config.scheduler.default_timezone.as_str());
        let tz = parse_timezone(tz_name)?;
        Ok(local_today(Utc::now(), tz))
    }

    /// JSON when `--json` was passed, otherwise one line per item.
    pub fn print<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

/// Unwrap a service envelope into an anyhow error.
pub fn take<T>(r: ServiceResponse<T>) -> Result<T> {
    r.into_result().map_err(anyhow::Error::msg)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::Init = cli.command {
        return config::init_config(cli.owner);
    }

    let app = App::open(cli.owner, cli.data_dir, cli.json).await?;

    match cli.command {
        Command::Init => {}
        Command::Budget { command } => budget_cmd::run_budget(&app, command).await?,
        Command::Expense { command } => budget_cmd::run_expense(&app, command).await?,
        Command::Task { command } => task_cmd::run_task(&app, command).await?,
        Command::Event { command } => task_cmd::run_event(&app, command).await?,
        Command::Notify { command } => notify_cmd::run(&app, command).await?,
        Command::Profile { command } => match command {
            ProfileCommand::Set { name, timezone } => {
                let mut profile = Profile::new(app.owner()?).with_timezone(timezone);
                profile.display_name = name.unwrap_or_default();
                let saved = take(app.services.profiles.upsert(profile).await)?;
                app.print(&saved, || {
                    println!("Saved profile {} ({})", saved.id, saved.timezone)
                })?;
            }
            ProfileCommand::List => {
                let all = take(app.services.profiles.list().await)?;
                app.print(&all, || {
                    for p in &all {
                        println!("{} | {} | {}", p.id, p.display_name, p.timezone);
                    }
                })?;
            }
        },
    }

    Ok(())
}
