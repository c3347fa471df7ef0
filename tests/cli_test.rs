mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use utils::run_syspkg_command;

#[test]
fn test_install_disabled_lists_packages() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(
        &env,
        &["install", "libfoo-dev", "foo-devel"],
        &[("SYSPKG_SYSREQUIRES_MODE", "disabled")],
    )?;
    assert_eq!(output.exit_code, 0, "install failed: {}", output.stderr);
    assert!(
        output
            .stdout
            .contains("The following packages need to be installed:\nlibfoo-dev\nfoo-devel"),
        "stdout was: {}",
        output.stdout
    );

    Ok(())
}

#[test]
fn test_invalid_mode_exits_with_error() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(
        &env,
        &["install", "libfoo-dev"],
        &[("SYSPKG_SYSREQUIRES_MODE", "test_not_valid_mode")],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(
        output
            .stderr
            .contains("SYSPKG_SYSREQUIRES_MODE=test_not_valid_mode is not allowed"),
        "stderr was: {}",
        output.stderr
    );

    Ok(())
}

#[test]
fn test_mode_flag_overrides_environment() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(
        &env,
        &["install", "--mode", "disabled", "libfoo-dev"],
        &[("SYSPKG_SYSREQUIRES_MODE", "test_not_valid_mode")],
    )?;
    // The environment is still parsed, so the bad value is reported.
    assert_eq!(output.exit_code, 1);

    let output = run_syspkg_command(
        &env,
        &["install", "--mode", "disabled", "libfoo-dev"],
        &[("SYSPKG_SYSREQUIRES_MODE", "enabled")],
    )?;
    assert_eq!(output.exit_code, 0, "install failed: {}", output.stderr);
    assert!(output.stdout.contains("libfoo-dev"));

    Ok(())
}

#[test]
fn test_config_file_sets_mode() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_config("mode = \"disabled\"\n")?;

    let output = run_syspkg_command(&env, &["update"], &[])?;
    assert_eq!(output.exit_code, 0, "update failed: {}", output.stderr);
    assert!(
        output
            .stdout
            .contains("Not updating system requirements. SYSPKG_SYSREQUIRES_MODE=disabled")
    );

    let output = run_syspkg_command(&env, &["config", "show"], &[])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("mode = \"disabled\""));

    Ok(())
}

#[test]
fn test_environment_overrides_config() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_config("mode = \"disabled\"\n")?;

    let output = run_syspkg_command(
        &env,
        &["update"],
        &[("SYSPKG_SYSREQUIRES_MODE", "verify")],
    )?;
    assert_eq!(output.exit_code, 0, "update failed: {}", output.stderr);
    assert!(output.stdout.contains("SYSPKG_SYSREQUIRES_MODE=verify"));

    Ok(())
}

#[test]
fn test_config_init_refuses_to_overwrite() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(&env, &["config", "init"], &[])?;
    assert_eq!(output.exit_code, 0, "init failed: {}", output.stderr);
    assert!(env.config_path().exists());

    let output = run_syspkg_command(&env, &["config", "init"], &[])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("already exists"));

    Ok(())
}

#[test]
fn test_triplet() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(&env, &["triplet", "Linux", "armv7hf"], &[])?;
    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout.trim(), "arm-linux-gnueabihf");

    let output = run_syspkg_command(
        &env,
        &["triplet", "Windows", "x86", "--compiler", "Visual Studio"],
        &[],
    )?;
    assert_eq!(output.stdout.trim(), "i686-windows-msvc");

    let output = run_syspkg_command(&env, &["triplet", "Windows", "x86"], &[])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("needed for os=Windows"));

    Ok(())
}

#[test]
fn test_triplet_json_output() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(
        &env,
        &["--output", "json", "triplet", "Android", "armv8"],
        &[],
    )?;
    assert_eq!(output.exit_code, 0);
    let event: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
    assert_eq!(event["code"], "syspkg.triplet");
    assert_eq!(event["data"]["triplet"], "aarch64-linux-android");

    Ok(())
}

#[test]
fn test_download_refuses_to_overwrite() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dest = env.path().join("archive.tgz");
    std::fs::write(&dest, "existing")?;

    let output = run_syspkg_command(
        &env,
        &[
            "download",
            "http://127.0.0.1:1/archive.tgz",
            dest.to_str().unwrap(),
        ],
        &[],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("already exists"));
    assert_eq!(std::fs::read_to_string(&dest)?, "existing");

    Ok(())
}

#[test]
fn test_completions_generate() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = run_syspkg_command(&env, &["completions", "generate", "bash"], &[])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("syspkg"));

    Ok(())
}
