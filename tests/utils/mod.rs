use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the built `syspkg` binary with a private config file and a clean
/// view of the syspkg variables, plus `vars`.
pub fn run_syspkg_command(
    env: &TestEnvironment,
    args: &[&str],
    vars: &[(&str, &str)],
) -> Result<CommandOutput> {
    let config = env.config_path();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_syspkg"));
    cmd.arg("--no-color")
        .arg("--config")
        .arg(&config)
        .args(args)
        .current_dir(env.path())
        .env_remove("SYSPKG_SYSREQUIRES_MODE")
        .env_remove("SYSPKG_SYSREQUIRES_SUDO")
        .envs(vars.iter().copied());

    let output = cmd.output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
