use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch area for one CLI test: its own config file and download dir.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Config file passed with `--config`; does not exist until written.
    pub fn config_path(&self) -> PathBuf {
        self.path().join("syspkg.toml")
    }

    pub fn write_config(&self, contents: &str) -> Result<PathBuf> {
        let path = self.config_path();
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
