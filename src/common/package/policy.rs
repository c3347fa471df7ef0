//! Execution policy: whether system package operations run, are only
//! verified, or are skipped, and whether they are elevated with sudo.

use std::fmt;
use std::str::FromStr;

use crate::common::config::Config;
use crate::common::env::{EnvSource, ProcessEnv, parse_bool};

use super::SystemPackageError;

pub const MODE_ENV_VAR: &str = "SYSPKG_SYSREQUIRES_MODE";
pub const SUDO_ENV_VAR: &str = "SYSPKG_SYSREQUIRES_SUDO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SysrequiresMode {
    /// Install missing packages.
    #[default]
    Enabled,
    /// Check only; fail if packages are missing.
    Verify,
    /// Never touch the system; report what would be needed.
    Disabled,
}

impl SysrequiresMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Verify => "verify",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SysrequiresMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SysrequiresMode {
    type Err = SystemPackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "enabled" => Ok(Self::Enabled),
            "verify" => Ok(Self::Verify),
            "disabled" => Ok(Self::Disabled),
            _ => Err(SystemPackageError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Resolved policy handed to a [`SystemPackageTool`](super::SystemPackageTool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionPolicy {
    pub mode: SysrequiresMode,
    pub sudo: bool,
}

impl ExecutionPolicy {
    pub fn new(mode: SysrequiresMode, sudo: bool) -> Self {
        Self { mode, sudo }
    }

    /// Policy from the process environment.
    pub fn from_env() -> Result<Self, SystemPackageError> {
        Self::from_source(&ProcessEnv)
    }

    /// Policy from an arbitrary variable source.
    ///
    /// A missing mode means `enabled`, a missing sudo flag means no sudo.
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, SystemPackageError> {
        let mode = match source.var(MODE_ENV_VAR) {
            Some(value) => value.parse()?,
            None => SysrequiresMode::default(),
        };
        let sudo = match source.var(SUDO_ENV_VAR) {
            Some(value) => parse_bool(&value),
            None => false,
        };
        Ok(Self { mode, sudo })
    }

    /// Policy from the config file, without looking at the environment.
    pub fn from_config(config: &Config) -> Result<Self, SystemPackageError> {
        let mode = match config.mode.as_deref() {
            Some(value) => value.parse()?,
            None => SysrequiresMode::default(),
        };
        let sudo = config.sudo.unwrap_or(false);
        Ok(Self { mode, sudo })
    }

    /// Let variables present in `source` override this policy.
    pub fn with_env_overrides(mut self, source: &dyn EnvSource) -> Result<Self, SystemPackageError> {
        if let Some(value) = source.var(MODE_ENV_VAR) {
            self.mode = value.parse()?;
        }
        if let Some(value) = source.var(SUDO_ENV_VAR) {
            self.sudo = parse_bool(&value);
        }
        Ok(self)
    }
}

/// Whether elevation looks both possible and needed: `sudo` exists and we
/// are not already root. Never on Windows. Nothing calls this implicitly;
/// the CLI uses it for `--sudo-auto`.
pub fn detect_elevation() -> bool {
    if cfg!(windows) {
        return false;
    }
    which::which("sudo").is_ok() && matches!(sudo::check(), sudo::RunningAs::User)
}
