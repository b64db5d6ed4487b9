use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn check(src: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netlayout"));
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("check")
        .arg("--src")
        .arg(fixture(src))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"));
    cmd
}

#[test]
fn check_prints_tree_and_summary() {
    check("fixtures/bridge-uplink.yaml")
        .arg("--bootmac")
        .arg("52:54:00:12:34:01")
        .assert()
        .success()
        .stdout(predicate::str::contains("from uplink"))
        .stdout(predicate::str::contains("from boot"))
        .stdout(predicate::str::contains(
            "result interfaces=6 roots=2 errors=0",
        ));
}

#[test]
fn check_reports_shared_member() {
    check("fixtures/shared-member.yaml")
        .assert()
        .failure()
        .stdout(predicate::str::contains("already owned by"))
        .stderr(predicate::str::contains("check failed"));
}

#[test]
fn check_reports_cycles() {
    check("fixtures/cycle.yaml")
        .assert()
        .failure()
        .stdout(predicate::str::contains("cycle detected"))
        .stdout(predicate::str::contains("br0 -> vlan15"));
}

#[test]
fn check_reports_transitive_cycle_path() {
    let output = check("fixtures/cycle-long.yaml")
        .arg("--format")
        .arg("json")
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["interfaces"], 4);
    let errors = report["errors"].as_array().expect("errors");
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .as_str()
        .expect("message")
        .ends_with("graph: br0: cycle detected: br0 -> vlan20 -> br1 -> vlan10 -> br0"));
}

#[test]
fn check_json_is_machine_readable() {
    let output = check("fixtures/vlan-on-vlan.yaml")
        .arg("--format")
        .arg("json")
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["interfaces"], 3);
    let errors = report["errors"].as_array().expect("errors");
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .as_str()
        .expect("message")
        .contains("cannot nest VLAN on VLAN"));
}

#[test]
fn check_json_tree_for_valid_layout() {
    let output = check("fixtures/single.yaml")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["roots"][0]["name"], "enp3s0");
    assert_eq!(report["roots"][0]["kind"], "physical");
    assert_eq!(report["roots"][0]["match_id"], "lan");
}
