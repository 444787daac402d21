use anyhow::{Context, Result};
use familyapp_services::{ExpenseDeletePolicy, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::{default_data_dir, ensure_familyapp_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreSection,
    pub scheduler: SchedulerConfig,
    pub expenses: ExpensesSection,
    pub cli: CliSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Directory holding one `<table>.json` per table. Defaults to `<home>/data`.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpensesSection {
    pub delete_policy: ExpenseDeletePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSection {
    /// Owner used when `--owner` is not passed.
    pub default_owner: Option<String>,
}

impl Config {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.store.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// `--owner` wins over `[cli].default_owner`.
    pub fn resolve_owner(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.cli.default_owner.clone())
            .filter(|o| !o.trim().is_empty())
            .context("no owner set. Pass --owner or set [cli].default_owner in config.toml")
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_familyapp_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s).context("parse config.toml")?;
    cfg.scheduler.validate().context("invalid [scheduler] section")?;
    Ok(cfg)
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config(owner: Option<String>) -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let mut cfg = Config::default();
    cfg.cli.default_owner = owner;
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}
