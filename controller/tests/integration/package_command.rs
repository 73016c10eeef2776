//! Integration tests for `fleetctl package build`.

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use predicates::prelude::*;

use crate::helpers::Fleet;

/// Write runtime, launcher and an unrelated file into `<fleet>/artifacts`.
fn artifacts(fleet: &Fleet) -> PathBuf {
    let dir = fleet.path().join("artifacts");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join("fleet-agent-core-1.0.jar"), vec![7u8; 2048]).expect("runtime");
    std::fs::write(dir.join("fleet-agent-launcher"), b"#!/bin/sh\n").expect("launcher");
    std::fs::write(dir.join("notes.txt"), b"skip me").expect("notes");
    dir
}

#[test]
fn test_build_writes_package_and_checksum() {
    let fleet = Fleet::new();
    let dir = artifacts(&fleet);
    let out_dir = fleet.path().join("out");

    fleet
        .cmd()
        .args(["package", "build", "--version", "2.1.0", "--region", "east"])
        .arg("--artifact-dir")
        .arg(&dir)
        .arg("--out")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("fleet-agent-2.1.0-east.tar.gz"));

    let package = out_dir.join("fleet-agent-2.1.0-east.tar.gz");
    assert!(package.exists());
    let sidecar = std::fs::read_to_string(out_dir.join("fleet-agent-2.1.0-east.tar.gz.sha256"))
        .expect("sidecar");
    assert!(sidecar.ends_with("  fleet-agent-2.1.0-east.tar.gz\n"), "{sidecar}");
}

#[test]
fn test_build_json_reports_artifact() {
    let fleet = Fleet::new();
    let dir = artifacts(&fleet);
    let out = fleet
        .cmd()
        .args(["--json", "package", "build", "--host", "10.1.1.1", "--port", "22"])
        .arg("--artifact")
        .arg(dir.join("fleet-agent-core-1.0.jar"))
        .arg("--artifact")
        .arg(dir.join("fleet-agent-launcher"))
        .arg("--out")
        .arg(fleet.path())
        .output()
        .expect("run");
    assert!(out.status.success(), "{out:?}");

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["artifact"]["delivery"]["mode"], "push");
    assert_eq!(v["artifact"]["delivery"]["host"], "10.1.1.1");
    assert_eq!(v["artifact"]["sha256"].as_str().expect("sha").len(), 64);
    assert!(v["artifact"].get("bytes").is_none());
}

#[test]
fn test_bound_too_small_fails_without_output() {
    let fleet = Fleet::new();
    let dir = artifacts(&fleet);
    let out_dir = fleet.path().join("out");

    fleet
        .cmd()
        .args(["package", "build", "--max-bytes", "100"])
        .arg("--artifact-dir")
        .arg(&dir)
        .arg("--out")
        .arg(&out_dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exceeds the 100-byte bound"));
    assert!(!out_dir.exists());
}

#[test]
fn test_owner_with_newline_is_rejected() {
    let fleet = Fleet::new();
    let dir = artifacts(&fleet);
    let out_dir = fleet.path().join("out");

    let out = fleet
        .cmd()
        .args(["--json", "package", "build", "--owner"])
        .arg("alice\nagent.controller_host=evil.example")
        .arg("--artifact-dir")
        .arg(&dir)
        .arg("--out")
        .arg(&out_dir)
        .output()
        .expect("run");
    assert_eq!(out.status.code(), Some(1), "{out:?}");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["code"], "build_failed");
    assert!(!out_dir.exists());
}

#[test]
fn test_missing_launcher_fails() {
    let fleet = Fleet::new();
    let dir = artifacts(&fleet);
    fleet
        .cmd()
        .args(["package", "build"])
        .arg("--artifact")
        .arg(dir.join("fleet-agent-core-1.0.jar"))
        .arg("--out")
        .arg(fleet.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("launcher artifact missing"));
}

#[test]
fn test_host_requires_port() {
    let fleet = Fleet::new();
    fleet
        .cmd()
        .args(["package", "build", "--artifact", "x", "--host", "h"])
        .assert()
        .code(2);
}

#[test]
fn test_no_artifacts_is_an_error() {
    let fleet = Fleet::new();
    fleet
        .cmd()
        .args(["package", "build"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no artifacts given"));
}
