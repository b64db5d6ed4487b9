use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn netlayout() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netlayout"));
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn compile_renders_netplan_to_stdout() {
    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/single.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("version: 2"))
        .stdout(predicate::str::contains("renderer: networkd"))
        .stdout(predicate::str::contains("enp3s0:"))
        .stdout(predicate::str::contains("dhcp4: true"));
}

#[test]
fn compile_builds_bond_bridge_vlan_stack() {
    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/bridge-uplink.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--bootmac")
        .arg("52:54:00:12:34:01")
        .assert()
        .success()
        .stdout(predicate::str::contains("bonds:"))
        .stdout(predicate::str::contains("- enp4s0"))
        .stdout(predicate::str::contains("- enp5s0"))
        .stdout(predicate::str::contains("mode: active-backup"))
        .stdout(predicate::str::contains("- bond0"))
        .stdout(predicate::str::contains("gateway4: 192.0.2.1"))
        .stdout(predicate::str::contains("id: 15"))
        .stdout(predicate::str::contains("link: br0"));
}

#[test]
fn boot_token_needs_a_boot_interface() {
    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/bridge-uplink.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Ethernet interface boot does not resolve to any interfaces",
        ));
}

#[test]
fn bind_macs_matches_members_by_address() {
    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/bridge-uplink.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--bootmac")
        .arg("52:54:00:12:34:01")
        .arg("--bind-macs")
        .assert()
        .success()
        .stdout(predicate::str::contains("match:"))
        .stdout(predicate::str::contains("52:54:00:12:34:03"));
}

#[test]
fn compile_writes_layout_into_dest_directory() {
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("out");

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/single.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--out")
        .arg("layout")
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success();

    let body = fs::read_to_string(dest.join("layout.yaml")).expect("layout written");
    assert!(body.contains("match-id: lan"), "{body}");
    assert!(body.contains("type: physical"), "{body}");
}

#[test]
fn compile_replaces_previous_output() {
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("netplan");
    fs::create_dir_all(&dest).expect("mkdir");
    fs::write(dest.join("stale.yaml"), "old").expect("write");

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/single.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success();

    assert!(dest.join("50-netlayout.yaml").exists());
    assert!(!dest.join("stale.yaml").exists());
}

#[test]
fn failed_compile_leaves_dest_untouched() {
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("netplan");
    fs::create_dir_all(&dest).expect("mkdir");
    fs::write(dest.join("keep.yaml"), "keep").expect("write");

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/vlan-on-vlan.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--dest")
        .arg(&dest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot nest VLAN on VLAN"));

    assert_eq!(
        fs::read_to_string(dest.join("keep.yaml")).expect("kept"),
        "keep"
    );
    assert!(!dest.join("50-netlayout.yaml").exists());
}

#[test]
fn wifi_and_old_versions_are_refused() {
    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/wifi.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wifi interfaces not supported"));

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/version1.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("version: 1 out of range 2:2"));
}

#[test]
fn policy_file_allows_unmatched_optional_ethernet() {
    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/optional-spare.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Ethernet interface spare does not resolve to any interfaces",
        ));

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/optional-spare.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--policy")
        .arg(fixture("fixtures/allow-optional.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("bond0:"))
        .stdout(predicate::str::contains("- enp4s0"))
        .stdout(predicate::str::contains("spare").not());
}

#[test]
fn declarations_are_read_from_stdin() {
    netlayout()
        .arg("compile")
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .write_stdin("network:\n  version: 2\n  ethernets:\n    enp5s0:\n      dhcp6: true\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("dhcp6: true"));
}

#[test]
fn unknown_keys_are_rejected() {
    netlayout()
        .arg("compile")
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .write_stdin("network:\n  version: 2\n  ethernets:\n    enp3s0:\n      mtu-bytes: 9000\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Key mtu-bytes is not supported"));
}

#[test]
fn compile_writes_networkd_units() {
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("network");

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/bridge-uplink.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--bootmac")
        .arg("52:54:00:12:34:01")
        .arg("--out")
        .arg("networkd")
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success();

    let bond = fs::read_to_string(dest.join("60-bond0.netdev")).expect("bond netdev");
    assert!(bond.contains("Kind=bond"), "{bond}");
    assert!(bond.contains("Mode=active-backup"), "{bond}");
    let member = fs::read_to_string(dest.join("60-enp5s0.network")).expect("member");
    assert!(member.contains("Bond=bond0"), "{member}");
    let bridge = fs::read_to_string(dest.join("60-br0.network")).expect("bridge");
    assert!(bridge.contains("Address=192.0.2.10/24"), "{bridge}");
    assert!(bridge.contains("VLAN=vlan15"), "{bridge}");
    let vlan = fs::read_to_string(dest.join("60-vlan15.netdev")).expect("vlan");
    assert!(vlan.contains("Id=15"), "{vlan}");
}

#[test]
fn compile_writes_ifcfg_scripts() {
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("network-scripts");

    netlayout()
        .arg("compile")
        .arg("--src")
        .arg(fixture("fixtures/bridge-uplink.yaml"))
        .arg("--phys")
        .arg(fixture("fixtures/phys.yaml"))
        .arg("--bootmac")
        .arg("52:54:00:12:34:01")
        .arg("--out")
        .arg("ifcfg")
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success();

    let bridge = fs::read_to_string(dest.join("ifcfg-br0")).expect("bridge");
    assert!(bridge.contains("TYPE=\"Bridge\""), "{bridge}");
    assert!(bridge.contains("NETMASK0=\"255.255.255.0\""), "{bridge}");
    assert!(bridge.contains("GATEWAY=\"192.0.2.1\""), "{bridge}");
    let member = fs::read_to_string(dest.join("ifcfg-enp4s0")).expect("member");
    assert!(member.contains("MASTER=\"bond0\""), "{member}");
    let vlan = fs::read_to_string(dest.join("ifcfg-vlan15")).expect("vlan");
    assert!(vlan.contains("PHYSDEV=\"br0\""), "{vlan}");
    assert!(vlan.contains("BOOTPROTO=\"dhcp\""), "{vlan}");
}
