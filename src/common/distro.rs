use std::fs;
use std::path::Path;

use duct::cmd;

use crate::common::package::PackageManager;

const APT_DISTROS: &[&str] = &[
    "debian", "ubuntu", "knoppix", "linuxmint", "raspbian", "neon", "pop",
];
const YUM_DISTROS: &[&str] = &[
    "pidora",
    "fedora",
    "scientific",
    "centos",
    "redhat",
    "rhel",
    "xenserver",
    "amazon",
    "oracle",
    "amzn",
    "almalinux",
];
const ZYPPER_DISTROS: &[&str] = &["opensuse", "sles"];
const PACMAN_DISTROS: &[&str] = &["arch", "manjaro"];

/// Snapshot of the host operating system.
///
/// Family flags are plain fields so callers (and tests) can build an
/// `OsInfo` by hand. Package manager capabilities are derived from the
/// family and distro on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsInfo {
    pub is_linux: bool,
    pub is_macos: bool,
    pub is_windows: bool,
    pub is_freebsd: bool,
    pub is_solaris: bool,
    /// Normalized distribution id (`ID` from os-release), Linux only.
    pub linux_distro: Option<String>,
    pub os_version: Option<String>,
    pub os_version_name: Option<String>,
    /// Whether `choco` was found on the search path (Windows only).
    pub has_choco: bool,
}

impl OsInfo {
    /// Inspect the running host.
    pub fn detect() -> Self {
        let mut info = Self::for_family(std::env::consts::OS);

        if info.is_linux {
            if let Some(release) = OsRelease::read(Path::new("/etc/os-release")) {
                info.apply_os_release(release);
            }
        } else if info.is_macos {
            info.os_version = macos_product_version();
            info.os_version_name = info.os_version.as_deref().and_then(macos_version_name);
        } else if info.is_windows {
            info.has_choco = which::which("choco").is_ok();
        }

        info
    }

    /// Build an `OsInfo` with only the family flag set, from a
    /// `std::env::consts::OS` style name.
    pub fn for_family(os: &str) -> Self {
        Self {
            is_linux: os == "linux",
            is_macos: os == "macos",
            is_windows: os == "windows",
            is_freebsd: os == "freebsd",
            is_solaris: matches!(os, "solaris" | "illumos"),
            ..Self::default()
        }
    }

    /// Fixture helper: a Linux host with the given distro id.
    pub fn linux(distro: &str) -> Self {
        Self {
            linux_distro: Some(distro.to_string()),
            ..Self::for_family("linux")
        }
    }

    fn apply_os_release(&mut self, release: OsRelease) {
        let distro = normalize_distro_id(&release.id);
        self.os_version_name = release.version_codename.filter(|name| !name.is_empty());
        if self.os_version_name.is_none() && distro == "debian" {
            self.os_version_name = release
                .version_id
                .as_deref()
                .and_then(debian_version_name)
                .map(str::to_string);
        }
        self.os_version = release.version_id;
        self.linux_distro = (!distro.is_empty()).then_some(distro);
    }

    fn distro_in(&self, table: &[&str]) -> bool {
        self.is_linux
            && self
                .linux_distro
                .as_deref()
                .is_some_and(|distro| table.contains(&distro))
    }

    pub fn with_apt(&self) -> bool {
        self.distro_in(APT_DISTROS)
    }

    pub fn with_yum(&self) -> bool {
        self.distro_in(YUM_DISTROS)
    }

    pub fn with_zypper(&self) -> bool {
        self.distro_in(ZYPPER_DISTROS)
    }

    pub fn with_pacman(&self) -> bool {
        self.distro_in(PACMAN_DISTROS)
    }

    /// The native package manager for this host, if one is supported.
    ///
    /// The order matters for hand-built fixtures where more than one
    /// family flag is set.
    pub fn package_manager(&self) -> Option<PackageManager> {
        if self.with_apt() {
            Some(PackageManager::Apt)
        } else if self.with_yum() {
            Some(PackageManager::Yum)
        } else if self.with_pacman() {
            Some(PackageManager::Pacman)
        } else if self.is_macos {
            Some(PackageManager::Brew)
        } else if self.is_freebsd {
            Some(PackageManager::Pkg)
        } else if self.is_solaris {
            Some(PackageManager::PkgUtil)
        } else if self.with_zypper() {
            Some(PackageManager::Zypper)
        } else if self.is_windows && self.has_choco {
            Some(PackageManager::Choco)
        } else {
            None
        }
    }

    /// Human readable family name
    pub fn family(&self) -> &'static str {
        if self.is_linux {
            "Linux"
        } else if self.is_macos {
            "macOS"
        } else if self.is_windows {
            "Windows"
        } else if self.is_freebsd {
            "FreeBSD"
        } else if self.is_solaris {
            "Solaris"
        } else {
            "Unknown"
        }
    }
}

impl std::fmt::Display for OsInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.family())?;
        if let Some(distro) = &self.linux_distro {
            write!(f, " ({})", distro)?;
        }
        if let Some(version) = &self.os_version {
            write!(f, " {}", version)?;
        }
        if let Some(name) = &self.os_version_name {
            write!(f, " \"{}\"", name)?;
        }
        Ok(())
    }
}

/// The fields of `/etc/os-release` that matter here.
#[derive(Debug, Default, PartialEq, Eq)]
struct OsRelease {
    id: String,
    version_id: Option<String>,
    version_codename: Option<String>,
}

impl OsRelease {
    fn read(path: &Path) -> Option<Self> {
        fs::read_to_string(path).ok().map(|content| Self::parse(&content))
    }

    fn parse(content: &str) -> Self {
        let mut release = Self::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key.trim() {
                "ID" => release.id = value.to_string(),
                "VERSION_ID" => release.version_id = Some(value.to_string()),
                "VERSION_CODENAME" => release.version_codename = Some(value.to_string()),
                _ => {}
            }
        }
        release
    }
}

fn normalize_distro_id(id: &str) -> String {
    let id = id.trim().to_lowercase();
    match id.as_str() {
        "opensuse-leap" | "opensuse-tumbleweed" => "opensuse".to_string(),
        "ol" => "oracle".to_string(),
        "amzn" => "amazon".to_string(),
        _ => id,
    }
}

/// Codename for Debian releases whose os-release lacks `VERSION_CODENAME`.
fn debian_version_name(version: &str) -> Option<&'static str> {
    let name = match version {
        v if v.starts_with("12") => "bookworm",
        v if v.starts_with("11") => "bullseye",
        v if v.starts_with("10") => "buster",
        v if v.starts_with('9') => "stretch",
        v if v.starts_with('8') => "jessie",
        v if v.starts_with('7') => "wheezy",
        v if v.starts_with('6') => "squeeze",
        v if v.starts_with('5') => "lenny",
        v if v.starts_with('4') => "etch",
        v if v.starts_with("3.1") => "sarge",
        v if v.starts_with("3.0") => "woody",
        _ => return None,
    };
    Some(name)
}

fn macos_product_version() -> Option<String> {
    cmd!("sw_vers", "-productVersion")
        .stderr_null()
        .read()
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn macos_version_name(version: &str) -> Option<String> {
    let mut parts = version.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);

    let name = match (major, minor) {
        (10, 5) => "Leopard",
        (10, 6) => "Snow Leopard",
        (10, 7) => "Lion",
        (10, 8) => "Mountain Lion",
        (10, 9) => "Mavericks",
        (10, 10) => "Yosemite",
        (10, 11) => "El Capitan",
        (10, 12) => "Sierra",
        (10, 13) => "High Sierra",
        (10, 14) => "Mojave",
        (10, 15) => "Catalina",
        (11, _) => "Big Sur",
        (12, _) => "Monterey",
        (13, _) => "Ventura",
        (14, _) => "Sonoma",
        (15, _) => "Sequoia",
        _ => return None,
    };
    Some(name.to_string())
}
