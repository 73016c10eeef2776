//! Integration tests for the fleetctl command tree.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::helpers::fleetctl;

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    fleetctl()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Controller for a fleet of remote work agents"));
}

#[test]
fn test_cli_help_lists_commands() {
    fleetctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("agents"))
        .stdout(predicate::str::contains("quota"))
        .stdout(predicate::str::contains("reconcile"))
        .stdout(predicate::str::contains("package"));
}

#[test]
fn test_version_command_shows_version() {
    fleetctl()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "fleetctl {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let out = fleetctl()
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_agents_help_lists_subcommands() {
    fleetctl()
        .args(["agents", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("approve"))
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("remove"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "reconcile:\n  concurrency: 0\n").expect("write");
    fleetctl()
        .env("FLEET_CONFIG", &config)
        .args(["agents", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn test_config_flag_overrides_env() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let bad = dir.path().join("bad.yaml");
    let good = dir.path().join("good.yaml");
    std::fs::write(&bad, "region: 'not a region!'\n").expect("write");
    std::fs::write(
        &good,
        format!("store:\n  path: {}\n", dir.path().join("agents.json").display()),
    )
    .expect("write");
    fleetctl()
        .env("FLEET_CONFIG", &bad)
        .arg("--config")
        .arg(&good)
        .args(["agents", "list"])
        .assert()
        .success();
}
