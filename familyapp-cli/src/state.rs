use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$FAMILYAPP_HOME`, or `~/.familyapp` when unset.
pub fn familyapp_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("FAMILYAPP_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".familyapp"))
}

pub fn ensure_familyapp_home() -> Result<PathBuf> {
    let dir = familyapp_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_data_dir() -> Result<PathBuf> {
    Ok(familyapp_home()?.join("data"))
}
