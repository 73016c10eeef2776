//! Integration tests for `fleetctl quota`.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::helpers::Fleet;

const ACCESS: &str = "access:
  admins: [root]
  users:
    alice:
      east: ~
      west: 1
";

fn fleet_with_agents() -> Fleet {
    let fleet = Fleet::with_config(ACCESS);
    for (name, region) in [("e1", "east"), ("e2", "east"), ("w1", "west"), ("w2", "west")] {
        fleet.register(name, &["--region", region, "--state", "ready", "--approve"]);
    }
    fleet.register("pending", &["--region", "east", "--state", "ready"]);
    fleet
}

fn quota_json(fleet: &Fleet, args: &[&str]) -> serde_json::Value {
    let out = fleet
        .cmd()
        .args(["--json", "quota"])
        .args(args)
        .output()
        .expect("run quota");
    assert!(out.status.success(), "quota failed: {out:?}");
    serde_json::from_slice(&out.stdout).expect("json")
}

#[test]
fn test_quota_applies_grants_and_caps() {
    let fleet = fleet_with_agents();
    let v = quota_json(&fleet, &["alice"]);
    assert_eq!(v["regions"]["east"], 2);
    assert_eq!(v["regions"]["west"], 1);
}

#[test]
fn test_admin_sees_every_region_uncapped() {
    let fleet = fleet_with_agents();
    let v = quota_json(&fleet, &["root"]);
    assert_eq!(v["regions"]["east"], 2);
    assert_eq!(v["regions"]["west"], 2);
}

#[test]
fn test_single_region_quota() {
    let fleet = fleet_with_agents();
    let v = quota_json(&fleet, &["alice", "--region", "east"]);
    assert_eq!(v["available"], 2);
}

#[test]
fn test_unauthorized_region_is_denied() {
    let fleet = fleet_with_agents();
    fleet
        .cmd()
        .args(["quota", "alice", "--region", "north"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("may not use agents in region 'north'"));
}

#[test]
fn test_unknown_user_is_denied() {
    let fleet = Fleet::with_config(ACCESS);
    let out = fleet
        .cmd()
        .args(["--json", "quota", "mallory"])
        .output()
        .expect("run");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["code"], "unknown_user");
}

#[test]
fn test_removed_agent_leaves_quota() {
    let fleet = Fleet::with_config(ACCESS);
    let id = fleet.register("e1", &["--region", "east", "--state", "ready", "--approve"]);
    assert_eq!(quota_json(&fleet, &["alice"])["regions"]["east"], 1);

    fleet
        .cmd()
        .args(["--yes", "agents", "remove", &id.to_string()])
        .assert()
        .success();
    assert_eq!(quota_json(&fleet, &["alice"])["regions"]["east"], 0);
}
