//! The system package tool: policy-aware update/install over one backend.

use std::ops::Deref;

use crate::common::distro::OsInfo;
use crate::common::env::{EnvSource, ProcessEnv};

use super::output::{ConsoleOutput, Output};
use super::policy::{ExecutionPolicy, MODE_ENV_VAR, SysrequiresMode};
use super::runner::{CommandRunner, Invocation, ShellRunner};
use super::{PackageManager, SystemPackageError};

/// Ordered alternative names for one requirement, e.g. a package that was
/// renamed between distro releases. Installing any one of them is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates(Vec<String>);

impl Candidates {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl Deref for Candidates {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Candidates {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for Candidates {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&[&str]> for Candidates {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Candidates {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<&[String]> for Candidates {
    fn from(names: &[String]) -> Self {
        Self(names.to_vec())
    }
}

impl From<Vec<String>> for Candidates {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for Candidates {
    fn from(names: Vec<&str>) -> Self {
        Self::from(names.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Install even if a candidate already reports installed.
    pub force: bool,
    /// Refresh the package index first (once per tool).
    pub update: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            force: false,
            update: true,
        }
    }
}

enum PolicySource {
    Fixed(ExecutionPolicy),
    Env(Box<dyn EnvSource>),
}

/// Drives a [`PackageManager`] through an injected [`CommandRunner`],
/// honoring an [`ExecutionPolicy`].
///
/// ```ignore
/// let mut spt = SystemPackageTool::new(ShellRunner)
///     .with_policy(ExecutionPolicy::from_env()?);
/// spt.install(["libssl-dev", "libssl1.0-dev"], false)?;
/// ```
pub struct SystemPackageTool<R: CommandRunner = ShellRunner> {
    runner: R,
    output: Box<dyn Output>,
    manager: Option<PackageManager>,
    policy: PolicySource,
    recommends: bool,
    up_to_date: bool,
}

impl SystemPackageTool<ShellRunner> {
    /// Shell runner, detected backend, policy read from the process
    /// environment at every operation.
    pub fn from_env() -> Self {
        Self::new(ShellRunner).with_policy_source(ProcessEnv)
    }
}

impl<R: CommandRunner> SystemPackageTool<R> {
    /// Tool for the backend of the running host, with the default policy.
    pub fn new(runner: R) -> Self {
        Self::for_os(runner, &OsInfo::detect())
    }

    /// Tool for the backend `os` calls for (none for unsupported hosts).
    pub fn for_os(runner: R, os: &OsInfo) -> Self {
        Self {
            runner,
            output: Box::new(ConsoleOutput),
            manager: os.package_manager(),
            policy: PolicySource::Fixed(ExecutionPolicy::default()),
            recommends: false,
            up_to_date: false,
        }
    }

    /// Force a backend regardless of the host.
    pub fn with_manager(mut self, manager: PackageManager) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = PolicySource::Fixed(policy);
        self
    }

    /// Resolve the policy from `source` at the start of every operation.
    pub fn with_policy_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.policy = PolicySource::Env(Box::new(source));
        self
    }

    pub fn with_output(mut self, output: impl Output + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Let APT pull recommended packages.
    pub fn with_recommends(mut self, recommends: bool) -> Self {
        self.recommends = recommends;
        self
    }

    pub fn manager(&self) -> Option<PackageManager> {
        self.manager
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn policy(&self) -> Result<ExecutionPolicy, SystemPackageError> {
        match &self.policy {
            PolicySource::Fixed(policy) => Ok(*policy),
            PolicySource::Env(source) => ExecutionPolicy::from_source(source.as_ref()),
        }
    }

    /// Refresh the package index.
    ///
    /// Skipped (with a note) in verify and disabled modes, and silently on
    /// hosts without a supported package manager.
    pub fn update(&mut self) -> Result<(), SystemPackageError> {
        let policy = self.policy()?;
        self.update_with(policy)
    }

    fn update_with(&mut self, policy: ExecutionPolicy) -> Result<(), SystemPackageError> {
        if policy.mode != SysrequiresMode::Enabled {
            self.output.info(&format!(
                "Not updating system requirements. {}={}",
                MODE_ENV_VAR, policy.mode
            ));
            return Ok(());
        }
        let Some(manager) = self.manager else {
            return Ok(());
        };

        let command = manager.update_command(policy.sudo);
        self.run_checked(&command, manager.accepted_update_codes())?;
        self.up_to_date = true;
        Ok(())
    }

    /// Whether `package` is installed according to the backend's query.
    pub fn installed(&mut self, package: &str) -> Result<bool, SystemPackageError> {
        let Some(manager) = self.manager else {
            return Ok(false);
        };
        let command = manager.installed_query(package);
        let code = self.exec(&Invocation::new(&command).quiet())?;
        Ok(code == 0)
    }

    /// Make sure at least one of `packages` is installed.
    pub fn install(
        &mut self,
        packages: impl Into<Candidates>,
        force: bool,
    ) -> Result<(), SystemPackageError> {
        self.install_with(
            packages,
            InstallOptions {
                force,
                ..InstallOptions::default()
            },
        )
    }

    pub fn install_with(
        &mut self,
        packages: impl Into<Candidates>,
        options: InstallOptions,
    ) -> Result<(), SystemPackageError> {
        let candidates = packages.into();
        let policy = self.policy()?;
        if candidates.is_empty() {
            return Ok(());
        }

        let report = format!(
            "The following packages need to be installed:\n{}",
            candidates.join("\n")
        );

        if policy.mode == SysrequiresMode::Disabled {
            self.output.info(&report);
            return Ok(());
        }

        if policy.mode == SysrequiresMode::Verify {
            // With no backend nothing counts as installed.
            if self.any_installed(&candidates)? {
                return Ok(());
            }
            self.output.error(&report);
            return Err(SystemPackageError::Aborted {
                mode: policy.mode,
                packages: candidates.names().to_vec(),
            });
        }

        let Some(manager) = self.manager else {
            self.output.warn(&format!(
                "No supported system package manager found, skipping: {}",
                candidates.join(", ")
            ));
            return Ok(());
        };

        if !options.force && self.any_installed(&candidates)? {
            return Ok(());
        }

        if options.update && !self.up_to_date {
            self.update_with(policy)?;
        }
        self.install_any(manager, policy, &candidates)
    }

    /// Query candidates in order, stopping at the first installed one.
    fn any_installed(
        &mut self,
        candidates: &Candidates,
    ) -> Result<bool, SystemPackageError> {
        for package in candidates.iter() {
            if self.installed(package)? {
                self.output
                    .info(&format!("Package already installed: {}", package));
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn install_any(
        &mut self,
        manager: PackageManager,
        policy: ExecutionPolicy,
        candidates: &Candidates,
    ) -> Result<(), SystemPackageError> {
        if let [package] = candidates.names() {
            return self.install_one(manager, policy, package);
        }

        for package in candidates.iter() {
            match self.install_one(manager, policy, package) {
                Ok(()) => return Ok(()),
                Err(SystemPackageError::CommandFailed { .. }) => {
                    self.output
                        .warn(&format!("Could not install '{}', trying next candidate", package));
                }
                Err(err) => return Err(err),
            }
        }

        Err(SystemPackageError::NoCandidateInstalled {
            packages: candidates.names().to_vec(),
        })
    }

    fn install_one(
        &mut self,
        manager: PackageManager,
        policy: ExecutionPolicy,
        package: &str,
    ) -> Result<(), SystemPackageError> {
        let command = manager.install_command(package, policy.sudo, self.recommends);
        self.run_checked(&command, &[0])
    }

    fn run_checked(
        &mut self,
        command: &str,
        accepted: &[i32],
    ) -> Result<(), SystemPackageError> {
        self.output.info(&format!("Running: {}", command));
        let code = self.exec(&Invocation::new(command))?;
        if accepted.contains(&code) {
            Ok(())
        } else {
            Err(SystemPackageError::CommandFailed {
                command: command.to_string(),
            })
        }
    }

    fn exec(&mut self, invocation: &Invocation<'_>) -> Result<i32, SystemPackageError> {
        self.runner
            .run(invocation)
            .map_err(|source| SystemPackageError::Runner {
                command: invocation.command.to_string(),
                source,
            })
    }
}
