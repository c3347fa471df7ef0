//! User configuration, stored as TOML in the syspkg config directory.
//!
//! Every field is optional in the file. Environment variables win over
//! whatever is configured here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Total attempts, at least one is made
    pub retry: u32,
    /// Seconds to wait between attempts
    pub retry_wait: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            retry: 2,
            retry_wait: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// enabled, verify or disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Prefix privileged commands with sudo; off when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sudo: Option<bool>,
    /// Let APT install recommended packages
    pub recommends: bool,
    pub download: DownloadConfig,
}

impl Config {
    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> Result<Config> {
        Self::load_from(&paths::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let c: Config = toml::from_str(&s)
            .with_context(|| format!("parsing config toml {}", path.display()))?;
        Ok(c)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self).context("serializing config to toml")?;
        fs::write(path, toml).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.download.retry, 2);
        assert_eq!(config.download.retry_wait, 5);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("syspkg.toml");
        fs::write(&path, "mode = \"verify\"\n\n[download]\nretry = 0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.mode.as_deref(), Some("verify"));
        assert_eq!(config.sudo, None);
        assert!(!config.recommends);
        assert_eq!(config.download.retry, 0);
        assert_eq!(config.download.retry_wait, 5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("syspkg.toml");
        let config = Config {
            sudo: Some(true),
            recommends: true,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("syspkg.toml");
        fs::write(&path, "mode = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing config toml"));
    }
}
