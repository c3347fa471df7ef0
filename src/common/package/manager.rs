//! Package manager backends and their command tables.

use std::borrow::Cow;

/// A native system package manager.
///
/// Every variant is a stateless command strategy: it only knows how to
/// spell `update`, `install` and the "is it installed?" query for its
/// ecosystem. Running those commands is the job of
/// [`SystemPackageTool`](super::SystemPackageTool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    /// APT - Debian/Ubuntu family
    Apt,
    /// Yum - Fedora/RHEL family
    Yum,
    /// Zypper - openSUSE/SLES
    Zypper,
    /// Pacman - Arch family
    Pacman,
    /// Homebrew - macOS
    Brew,
    /// pkg - FreeBSD
    Pkg,
    /// pkgutil (OpenCSW) - Solaris
    PkgUtil,
    /// Chocolatey - Windows, optional
    Choco,
}

impl PackageManager {
    pub const ALL: [PackageManager; 8] = [
        Self::Apt,
        Self::Yum,
        Self::Zypper,
        Self::Pacman,
        Self::Brew,
        Self::Pkg,
        Self::PkgUtil,
        Self::Choco,
    ];

    /// Whether update/install commands may carry the `sudo ` prefix.
    ///
    /// Homebrew refuses to run as root and Chocolatey has no sudo.
    pub fn supports_elevation(&self) -> bool {
        !matches!(self, Self::Brew | Self::Choco)
    }

    /// Exit codes of the update command that count as success.
    ///
    /// `yum check-update` exits with 100 when updates are available.
    pub fn accepted_update_codes(&self) -> &'static [i32] {
        match self {
            Self::Yum => &[0, 100],
            _ => &[0],
        }
    }

    fn sudo_prefix(&self, sudo: bool) -> &'static str {
        if sudo && self.supports_elevation() {
            "sudo "
        } else {
            ""
        }
    }

    pub fn update_command(&self, sudo: bool) -> String {
        let base = match self {
            Self::Apt => "apt-get update",
            Self::Yum => "yum check-update",
            Self::Zypper => "zypper --non-interactive ref",
            Self::Pacman => "pacman -Syyu --noconfirm",
            Self::Brew => "brew update",
            Self::Pkg => "pkg update",
            Self::PkgUtil => "pkgutil --catalog",
            Self::Choco => "choco outdated",
        };
        format!("{}{}", self.sudo_prefix(sudo), base)
    }

    /// Install command for one package.
    ///
    /// `recommends` only matters for APT, where it drops
    /// `--no-install-recommends`.
    pub fn install_command(&self, package: &str, sudo: bool, recommends: bool) -> String {
        let package = self.quote(package);
        let base = match self {
            Self::Apt if recommends => format!("apt-get install -y {}", package),
            Self::Apt => format!("apt-get install -y --no-install-recommends {}", package),
            Self::Yum => format!("yum install -y {}", package),
            Self::Zypper => format!("zypper --non-interactive in {}", package),
            Self::Pacman => format!("pacman -S --noconfirm {}", package),
            Self::Brew => format!("brew install {}", package),
            Self::Pkg => format!("pkg install -y {}", package),
            Self::PkgUtil => format!("pkgutil --install --yes {}", package),
            Self::Choco => format!("choco install --yes {}", package),
        };
        format!("{}{}", self.sudo_prefix(sudo), base)
    }

    /// POSIX quoting for `sh -c`. Choco runs under `cmd /C`, which would keep
    /// single quotes literally, so its names pass through untouched.
    fn quote<'a>(&self, package: &'a str) -> Cow<'a, str> {
        match self {
            Self::Choco => Cow::Borrowed(package),
            _ => shell_words::quote(package),
        }
    }

    /// Query whose zero exit status means the package is installed.
    /// Never elevated.
    pub fn installed_query(&self, package: &str) -> String {
        let package = self.quote(package);
        match self {
            Self::Apt => format!("dpkg -s {}", package),
            Self::Yum | Self::Zypper => format!("rpm -q {}", package),
            Self::Pacman => format!("pacman -Qi {}", package),
            Self::Brew => format!("test -n \"$(brew ls --versions {})\"", package),
            Self::Pkg => format!("pkg info {}", package),
            Self::PkgUtil => format!("test -n \"`pkgutil --list {}`\"", package),
            Self::Choco => format!(
                "choco search --local-only --exact {} | findstr /c:\"1 packages installed.\"",
                package
            ),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Apt => "APT",
            Self::Yum => "Yum",
            Self::Zypper => "Zypper",
            Self::Pacman => "Pacman",
            Self::Brew => "Homebrew",
            Self::Pkg => "pkg",
            Self::PkgUtil => "pkgutil",
            Self::Choco => "Chocolatey",
        }
    }

    /// Short lowercase name, used on the command line and in config files.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Yum => "yum",
            Self::Zypper => "zypper",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
            Self::Pkg => "pkg",
            Self::PkgUtil => "pkgutil",
            Self::Choco => "choco",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PackageManager {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.id() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown package manager '{}'", s))
    }
}
