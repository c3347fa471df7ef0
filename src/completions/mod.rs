//! Shell completion scripts for the `syspkg` binary.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use clap_complete::Shell;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SupportedShell {
    Bash,
    Zsh,
    Fish,
}

impl SupportedShell {
    fn generator(self) -> Shell {
        match self {
            Self::Bash => Shell::Bash,
            Self::Zsh => Shell::Zsh,
            Self::Fish => Shell::Fish,
        }
    }

    /// Where the shell looks for completions when installed per user.
    fn default_path(self) -> Result<PathBuf> {
        let data = dirs::data_dir().context("Unable to determine user data directory")?;
        Ok(match self {
            Self::Bash => data.join("bash-completion/completions/syspkg"),
            Self::Zsh => data.join("syspkg/completions/_syspkg"),
            Self::Fish => dirs::config_dir()
                .context("Unable to determine user config directory")?
                .join("fish/completions/syspkg.fish"),
        })
    }
}

impl fmt::Display for SupportedShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
        })
    }
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum CompletionCommands {
    /// Print the completion script to stdout
    Generate {
        #[arg(value_enum)]
        shell: SupportedShell,
    },
    /// Write the completion script where the shell picks it up
    Install {
        #[arg(value_enum)]
        shell: SupportedShell,
        /// Write here instead of the default location
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
}

pub fn generate(shell: SupportedShell) -> Result<String> {
    let mut command = crate::cli_command();
    let mut buffer = Vec::new();
    clap_complete::generate(shell.generator(), &mut command, "syspkg", &mut buffer);
    String::from_utf8(buffer).context("rendering completions")
}

pub fn install(shell: SupportedShell, output: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let target = match output {
        Some(path) => path,
        None => shell.default_path()?,
    };
    if target.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", target.display());
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating completions directory {}", parent.display()))?;
    }

    fs::write(&target, generate(shell)?)
        .with_context(|| format!("writing completion script to {}", target.display()))?;
    Ok(target)
}

/// What the user still has to do after `install`.
pub fn instructions(shell: SupportedShell, path: &Path) -> String {
    match shell {
        SupportedShell::Bash => format!(
            "bash-completion loads {} automatically; otherwise add `source \"{}\"` to ~/.bashrc",
            path.display(),
            path.display()
        ),
        SupportedShell::Zsh => format!(
            "Add to ~/.zshrc:\n  fpath=(\"{}\" $fpath)\n  autoload -U compinit && compinit",
            path.parent().unwrap_or(path).display()
        ),
        SupportedShell::Fish => format!("fish loads {} on the next start", path.display()),
    }
}
