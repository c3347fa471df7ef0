use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the syspkg config directory, creating it if needed
pub fn syspkg_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("syspkg");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Path of the main config file (may not exist yet)
pub fn config_file_path() -> Result<PathBuf> {
    Ok(syspkg_config_dir()?.join("syspkg.toml"))
}
