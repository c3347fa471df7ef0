//! Command execution seam for the system package tool.

use anyhow::{Context, Result};
use duct::cmd;

/// One command handed to a [`CommandRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Full shell command line.
    pub command: &'a str,
    /// Discard the command's stdout/stderr.
    pub quiet: bool,
    /// On Windows, run through `bash --login -c` instead of `cmd /C`.
    pub win_bash: bool,
    /// Windows bash subsystem hint (msys2, cygwin, wsl); informational.
    pub subsystem: Option<&'a str>,
}

impl<'a> Invocation<'a> {
    pub fn new(command: &'a str) -> Self {
        Self {
            command,
            quiet: false,
            win_bash: false,
            subsystem: None,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Runs shell commands and reports their exit code.
///
/// A non-zero code is not an error at this level; `Err` means the command
/// could not be started at all.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<i32>;
}

impl<F> CommandRunner for F
where
    F: FnMut(&Invocation<'_>) -> Result<i32>,
{
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<i32> {
        self(invocation)
    }
}

/// Runs commands through the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    fn expression(invocation: &Invocation<'_>) -> duct::Expression {
        if cfg!(windows) {
            if invocation.win_bash {
                cmd!("bash", "--login", "-c", invocation.command)
            } else {
                cmd!("cmd", "/C", invocation.command)
            }
        } else {
            cmd!("sh", "-c", invocation.command)
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<i32> {
        let mut expression = Self::expression(invocation).unchecked();
        if invocation.quiet {
            expression = expression.stdout_null().stderr_null();
        }
        let output = expression
            .run()
            .with_context(|| format!("spawning '{}'", invocation.command))?;
        // Killed by a signal: no code, treat as failure.
        Ok(output.status.code().unwrap_or(-1))
    }
}
