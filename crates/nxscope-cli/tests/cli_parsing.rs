//! CLI parsing tests for the nxscope command
//!
//! Tests that verify argument parsing and the commands that work without
//! a Node toolchain.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the nxscope binary, isolated from the caller's home
#[allow(deprecated)]
fn nxscope(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nxscope").expect("Failed to find nxscope binary");
    cmd.env("HOME", home)
        .env_remove("NXSCOPE_WORKSPACE")
        .env_remove("NXSCOPE_CONFIG")
        .env_remove("NXSCOPE_NODE");
    cmd
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    let home = TempDir::new().unwrap();
    nxscope(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("locate"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("pm"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("mcp"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    nxscope(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nxscope"));
}

// ============================================================================
// Global Options Tests
// ============================================================================

#[test]
fn test_global_options_in_help() {
    let home = TempDir::new().unwrap();
    nxscope(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--workspace"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--node"))
        .stdout(predicate::str::contains("--no-daemon"));
}

#[test]
fn test_subcommand_help() {
    let home = TempDir::new().unwrap();
    nxscope(home.path())
        .args(["projects", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--topo"))
        .stdout(predicate::str::contains("--json"));

    nxscope(home.path())
        .args(["mcp", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-tokens"))
        .stdout(predicate::str::contains("--log-file"));
}

#[test]
fn test_unknown_command_fails() {
    let home = TempDir::new().unwrap();
    nxscope(home.path())
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_topo_conflicts_with_name() {
    let home = TempDir::new().unwrap();
    nxscope(home.path())
        .args(["projects", "app", "--topo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ============================================================================
// Commands Without a Graph Build
// ============================================================================

#[test]
fn test_missing_workspace_is_an_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("missing");
    nxscope(home.path())
        .arg("-w")
        .arg(&missing)
        .arg("pm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid workspace"));
}

#[test]
fn test_locate_finds_installed_package() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();
    write(ws.path(), "node_modules/@scope/tool/package.json", r#"{"name": "@scope/tool"}"#);

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["locate", "@scope/tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node_modules/@scope/tool/package.json"));
}

#[test]
fn test_locate_falls_back_to_encapsulated_install() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();
    write(ws.path(), ".nx/installation/node_modules/nx/bin/nx.js", "");

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["locate", "nx", "bin/nx.js", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".nx/installation/node_modules/nx/bin/nx.js"));
}

#[test]
fn test_locate_missing_package_fails() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["locate", "left-pad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("left-pad not found"));
}

#[test]
fn test_pm_detects_lock_file() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();
    write(ws.path(), "yarn.lock", "");

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["pm", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""manager": "yarn""#));
}

#[test]
fn test_pm_prefers_corepack_pin() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();
    write(ws.path(), "yarn.lock", "");
    write(ws.path(), "package.json", r#"{"packageManager": "pnpm@9.1.0"}"#);

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .arg("pm")
        .assert()
        .success()
        .stdout(predicate::str::contains("pnpm (pinned: pnpm@9.1.0)"))
        .stdout(predicate::str::contains("corepack pnpm install"));
}

#[test]
fn test_version_reports_capabilities() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();
    write(ws.path(), "node_modules/nx/package.json", r#"{"version": "18.2.1"}"#);

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["version", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("18.2.1"))
        .stdout(predicate::str::contains(r#""sourceMaps": true"#))
        .stdout(predicate::str::contains(r#""package": "nx""#));
}

#[test]
fn test_version_without_install_fails() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nx is not installed"));
}

#[test]
fn test_snapshot_of_plain_directory_is_invalid() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["snapshot", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a valid Nx workspace"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_init_set_get() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    assert!(ws.path().join(".nxscope/config.toml").exists());

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["config", "set", "daemon.enabled", "false"])
        .assert()
        .success();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["config", "get", "daemon.enabled"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
}

#[test]
fn test_no_daemon_flag_overrides_config() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["--no-daemon", "config", "get", "daemon.enabled"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
}

#[test]
fn test_config_path_json() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .args(["config", "path", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".nxscope"))
        .stdout(predicate::str::contains(r#""local_exists": false"#));
}

#[test]
fn test_config_file_override_is_used() {
    let home = TempDir::new().unwrap();
    let ws = TempDir::new().unwrap();
    write(ws.path(), "custom.toml", "[node]\nbinary = \"/opt/node/bin/node\"\n");

    nxscope(home.path())
        .arg("-w")
        .arg(ws.path())
        .arg("-c")
        .arg(ws.path().join("custom.toml"))
        .args(["config", "get", "node.binary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/opt/node/bin/node"));
}
