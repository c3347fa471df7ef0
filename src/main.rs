mod completions;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::json;
use std::path::PathBuf;

use syspkg::common;
use syspkg::common::config::Config;
use syspkg::common::distro::OsInfo;
use syspkg::common::download::{Auth, DownloadOptions, download};
use syspkg::common::env::ProcessEnv;
use syspkg::common::package::{
    ConsoleOutput, ExecutionPolicy, InstallOptions, PackageManager, ShellRunner, SystemPackageTool,
    detect_elevation,
};
use syspkg::common::triplet::gnu_triplet;
use syspkg::ui::{self, prelude::*};

use crate::completions::CompletionCommands;

/// Install system packages through whatever package manager the host has
#[derive(Parser, Debug)]
#[command(name = "syspkg", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Use this config file instead of ~/.config/syspkg/syspkg.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct PolicyArgs {
    /// enabled, verify or disabled (overrides SYSPKG_SYSREQUIRES_MODE)
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// Prefix privileged commands with sudo
    #[arg(long, conflicts_with_all = ["no_sudo", "sudo_auto"])]
    sudo: bool,

    /// Never use sudo
    #[arg(long, conflicts_with = "sudo_auto")]
    no_sudo: bool,

    /// Use sudo only when it is installed and we are not root
    #[arg(long)]
    sudo_auto: bool,

    /// Use this package manager instead of the detected one
    #[arg(long, value_name = "MANAGER")]
    manager: Option<PackageManager>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the detected OS and package manager
    Detect,

    /// Refresh the package index
    Update {
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Install the first available of the given alternative packages
    Install {
        /// Candidate package names, in order of preference
        #[arg(required = true)]
        packages: Vec<String>,

        /// Install even if a candidate is already present
        #[arg(short, long)]
        force: bool,

        /// Skip refreshing the package index
        #[arg(long)]
        no_update: bool,

        /// Let APT install recommended packages
        #[arg(long)]
        recommends: bool,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Check whether packages are installed
    Installed {
        #[arg(required = true)]
        packages: Vec<String>,

        /// Use this package manager instead of the detected one
        #[arg(long, value_name = "MANAGER")]
        manager: Option<PackageManager>,
    },

    /// Download a file, retrying transient failures
    Download {
        url: String,
        dest: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,

        /// Expected SHA-256 of the file
        #[arg(long)]
        sha256: Option<String>,

        /// Expected MD5 of the file
        #[arg(long)]
        md5: Option<String>,

        /// Total attempts (default from config)
        #[arg(long)]
        retry: Option<u32>,

        /// Seconds between attempts (default from config)
        #[arg(long)]
        retry_wait: Option<u64>,

        /// Extra request header, as "Name: value"
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Basic auth user
        #[arg(long, conflicts_with = "token")]
        user: Option<String>,

        /// Basic auth password
        #[arg(long, requires = "user")]
        password: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,
    },

    /// Print the GNU triplet for an OS/architecture pair
    Triplet {
        /// Linux, Windows, Macos, Android, iOS, FreeBSD, SunOS, ...
        os: String,
        /// x86, x86_64, armv7hf, armv8, ...
        arch: String,
        /// Compiler name, required for Windows (gcc, Visual Studio)
        #[arg(long)]
        compiler: Option<String>,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Shell completion helpers
    Completions {
        #[command(subcommand)]
        command: CompletionCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

pub fn cli_command() -> clap::Command {
    Cli::command()
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Config first, then environment variables, then command line flags.
fn resolve_policy(config: &Config, args: &PolicyArgs) -> Result<ExecutionPolicy> {
    let mut policy = ExecutionPolicy::from_config(config)?.with_env_overrides(&ProcessEnv)?;
    if let Some(mode) = &args.mode {
        policy.mode = mode.parse()?;
    }
    if args.sudo {
        policy.sudo = true;
    }
    if args.no_sudo {
        policy.sudo = false;
    }
    if args.sudo_auto {
        policy.sudo = detect_elevation();
    }
    emit(
        Level::Debug,
        "syspkg.policy",
        &format!("mode={} sudo={}", policy.mode, policy.sudo),
        None,
    );
    Ok(policy)
}

fn build_tool(
    config: &Config,
    args: &PolicyArgs,
    recommends: bool,
) -> Result<SystemPackageTool<ShellRunner>> {
    let policy = resolve_policy(config, args)?;
    let mut tool = SystemPackageTool::new(ShellRunner)
        .with_policy(policy)
        .with_recommends(recommends || config.recommends);
    if let Some(manager) = args.manager {
        tool = tool.with_manager(manager);
    }
    Ok(tool)
}

fn handle_detect() -> Result<i32> {
    let os = OsInfo::detect();
    let manager = os.package_manager();

    if get_output_format() == OutputFormat::Json {
        emit(
            Level::Info,
            "syspkg.detect",
            &os.to_string(),
            Some(json!({
                "family": os.family(),
                "distro": os.linux_distro,
                "version": os.os_version,
                "version_name": os.os_version_name,
                "package_manager": manager.map(|m| m.id()),
            })),
        );
        return Ok(0);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Property", "Value"]);
    let unknown = || "-".to_string();
    table.add_row(vec!["OS".to_string(), os.family().to_string()]);
    table.add_row(vec![
        "Distribution".to_string(),
        os.linux_distro.clone().unwrap_or_else(unknown),
    ]);
    table.add_row(vec![
        "Version".to_string(),
        os.os_version.clone().unwrap_or_else(unknown),
    ]);
    table.add_row(vec![
        "Version name".to_string(),
        os.os_version_name.clone().unwrap_or_else(unknown),
    ]);
    table.add_row(vec![
        "Package manager".to_string(),
        manager
            .map(|m| m.display_name().to_string())
            .unwrap_or_else(|| "none".to_string()),
    ]);
    println!("{table}");
    Ok(0)
}

fn handle_installed(packages: &[String], manager: Option<PackageManager>) -> Result<i32> {
    let mut tool = SystemPackageTool::new(ShellRunner);
    if let Some(manager) = manager {
        tool = tool.with_manager(manager);
    }
    if tool.manager().is_none() {
        return Err(anyhow!("No supported system package manager found"));
    }

    let mut missing = 0;
    for package in packages {
        let installed = tool.installed(package)?;
        if !installed {
            missing += 1;
        }
        emit(
            if installed { Level::Success } else { Level::Warn },
            "syspkg.installed",
            &format!(
                "{}: {}",
                package,
                if installed { "installed" } else { "not installed" }
            ),
            Some(json!({ "package": package, "installed": installed })),
        );
    }
    Ok(if missing == 0 { 0 } else { 1 })
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("invalid header '{}', expected 'Name: value'", raw))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn handle_config(command: ConfigCommands, config: &Config, path: Option<&PathBuf>) -> Result<i32> {
    match command {
        ConfigCommands::Show => {
            let toml = toml::to_string_pretty(config).context("serializing config to toml")?;
            print!("{toml}");
        }
        ConfigCommands::Init { force } => {
            let target = match path {
                Some(path) => path.clone(),
                None => common::paths::config_file_path()?,
            };
            if target.exists() && !force {
                return Err(anyhow!(
                    "{} already exists, pass --force to overwrite",
                    target.display()
                ));
            }
            Config::default().save_to(&target)?;
            emit(
                Level::Success,
                "syspkg.config.init",
                &format!("Wrote {}", target.display()),
                None,
            );
        }
    }
    Ok(0)
}

fn handle_completions(command: CompletionCommands) -> Result<i32> {
    match command {
        CompletionCommands::Generate { shell } => {
            print!("{}", completions::generate(shell)?);
        }
        CompletionCommands::Install {
            shell,
            output,
            force,
        } => {
            let path = completions::install(shell, output, force)?;
            emit(
                Level::Success,
                "syspkg.completions.installed",
                &format!("Installed {} completions to {}", shell, path.display()),
                None,
            );
            emit(
                Level::Info,
                "syspkg.completions.instructions",
                &completions::instructions(shell, &path),
                None,
            );
        }
    }
    Ok(0)
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.as_ref();
    match cli.command {
        Commands::Detect => handle_detect(),
        Commands::Update { policy } => {
            let config = load_config(config_path)?;
            build_tool(&config, &policy, false)?.update()?;
            Ok(0)
        }
        Commands::Install {
            packages,
            force,
            no_update,
            recommends,
            policy,
        } => {
            let config = load_config(config_path)?;
            let mut tool = build_tool(&config, &policy, recommends)?;
            tool.install_with(
                packages,
                InstallOptions {
                    force,
                    update: !no_update,
                },
            )?;
            Ok(0)
        }
        Commands::Installed { packages, manager } => handle_installed(&packages, manager),
        Commands::Download {
            url,
            dest,
            overwrite,
            sha256,
            md5,
            retry,
            retry_wait,
            headers,
            user,
            password,
            token,
        } => {
            let config = load_config(config_path)?;
            let auth = match (user, token) {
                (Some(user), _) => Some(Auth::Basic { user, password }),
                (None, Some(token)) => Some(Auth::Bearer(token)),
                (None, None) => None,
            };
            let options = DownloadOptions {
                retry: retry.unwrap_or(config.download.retry),
                retry_wait: retry_wait.unwrap_or(config.download.retry_wait),
                overwrite,
                auth,
                headers: headers
                    .iter()
                    .map(|h| parse_header(h))
                    .collect::<Result<Vec<_>>>()?,
                sha256,
                md5,
            };
            download(&url, &dest, &options, &mut ConsoleOutput)?;
            emit(
                Level::Success,
                "syspkg.download.done",
                &format!("Downloaded {} to {}", url, dest.display()),
                None,
            );
            Ok(0)
        }
        Commands::Triplet { os, arch, compiler } => {
            let triplet = gnu_triplet(&os, &arch, compiler.as_deref())?;
            emit(
                Level::Info,
                "syspkg.triplet",
                &triplet,
                Some(json!({ "os": os, "arch": arch, "triplet": triplet })),
            );
            Ok(0)
        }
        Commands::Config { command } => {
            let config = load_config(config_path)?;
            handle_config(command, &config, config_path)
        }
        Commands::Completions { command } => handle_completions(command),
    }
}

fn main() {
    let cli = Cli::parse();
    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            emit(Level::Error, "syspkg.error", &format!("Error: {:#}", err), None);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_cli_definition_is_valid() {
        cli_command().debug_assert();
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer abc:def").unwrap(),
            ("Authorization".to_string(), "Bearer abc:def".to_string())
        );
        assert!(parse_header("no-colon").is_err());
    }

    #[test]
    #[serial]
    fn test_flags_override_config() {
        let config = Config {
            mode: Some("verify".into()),
            sudo: Some(true),
            ..Config::default()
        };
        let args = PolicyArgs {
            mode: Some("disabled".into()),
            no_sudo: true,
            ..PolicyArgs::default()
        };
        let policy = resolve_policy(&config, &args).unwrap();
        assert_eq!(policy.mode, common::package::SysrequiresMode::Disabled);
        assert!(!policy.sudo);
    }

    #[test]
    #[serial]
    fn test_unset_sudo_stays_off() {
        use syspkg::common::env::{EnvChange, environment_append};
        use syspkg::common::package::{MODE_ENV_VAR, SUDO_ENV_VAR};

        let _scope = environment_append(&[
            (SUDO_ENV_VAR, EnvChange::Unset),
            (MODE_ENV_VAR, EnvChange::Unset),
        ]);
        let policy = resolve_policy(&Config::default(), &PolicyArgs::default()).unwrap();
        assert!(!policy.sudo);
    }

    #[test]
    fn test_sudo_flags_conflict() {
        assert!(Cli::try_parse_from(["syspkg", "update", "--sudo", "--sudo-auto"]).is_err());
        assert!(Cli::try_parse_from(["syspkg", "update", "--no-sudo", "--sudo-auto"]).is_err());
        assert!(Cli::try_parse_from(["syspkg", "update", "--sudo-auto"]).is_ok());
    }

    #[test]
    fn test_install_args() {
        let cli = Cli::try_parse_from([
            "syspkg", "install", "libssl-dev", "openssl-devel", "--force", "--mode", "verify",
        ])
        .unwrap();
        match cli.command {
            Commands::Install {
                packages,
                force,
                policy,
                ..
            } => {
                assert_eq!(packages, vec!["libssl-dev", "openssl-devel"]);
                assert!(force);
                assert_eq!(policy.mode.as_deref(), Some("verify"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
