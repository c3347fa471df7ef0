use thiserror::Error;

use super::policy::{MODE_ENV_VAR, SysrequiresMode};

#[derive(Debug, Error)]
pub enum SystemPackageError {
    #[error(
        "{}={value} is not allowed, allowed modes: enabled, verify, disabled",
        MODE_ENV_VAR
    )]
    InvalidMode { value: String },

    #[error("Command '{command}' failed")]
    CommandFailed { command: String },

    #[error("Could not install any of: {}", .packages.join(", "))]
    NoCandidateInstalled { packages: Vec<String> },

    #[error(
        "Aborted due to {}={mode}. Some system packages need to be installed:\n{}",
        MODE_ENV_VAR,
        .packages.join("\n")
    )]
    Aborted {
        mode: SysrequiresMode,
        packages: Vec<String>,
    },

    #[error("Failed to run '{command}'")]
    Runner {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}
