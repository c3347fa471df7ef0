//! System package management across apt, yum, zypper, pacman, brew, pkg,
//! pkgutil and choco.
//!
//! - [`PackageManager`]: the closed set of backends and their command lines
//! - [`ExecutionPolicy`]: whether to install, only verify, or do nothing
//! - [`SystemPackageTool`]: runs update/install/installed through a
//!   [`CommandRunner`] under that policy
//!
//! ```ignore
//! use crate::common::package::{ExecutionPolicy, ShellRunner, SystemPackageTool};
//!
//! let mut spt = SystemPackageTool::new(ShellRunner).with_policy(ExecutionPolicy::from_env()?);
//! spt.install(["libgl1-mesa-dev", "mesa-libGL-devel"], false)?;
//! ```

mod error;
mod manager;
mod output;
mod policy;
mod runner;
mod tool;

pub use error::SystemPackageError;
pub use manager::PackageManager;
pub use output::{BufferOutput, ConsoleOutput, Output};
pub use policy::{ExecutionPolicy, MODE_ENV_VAR, SUDO_ENV_VAR, SysrequiresMode, detect_elevation};
pub use runner::{CommandRunner, Invocation, ShellRunner};
pub use tool::{Candidates, InstallOptions, SystemPackageTool};
