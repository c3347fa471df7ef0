//! syspkg: install system packages through apt, yum, zypper, pacman, brew,
//! pkg, pkgutil or choco under an enabled/verify/disabled policy.

pub mod common;
pub mod ui;
