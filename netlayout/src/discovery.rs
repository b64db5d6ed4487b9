//! Physical NIC discovery and snapshot I/O.
//!
//! Discovery runs once per invocation and returns a fixed list. Snapshots
//! written by `gather` can be fed back to `compile` on another machine; the
//! compiler treats both sources identically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::addr::HardwareAddr;

const SYS_CLASS_NET: &str = "/sys/class/net";

const STABLE_NAME_KEYS: [&str; 3] = [
    "ID_NET_NAME_ONBOARD",
    "ID_NET_NAME_SLOT",
    "ID_NET_NAME_PATH",
];

/// A NIC present on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalNic {
    pub name: String,
    pub stable_name: String,
    /// Positional name (`nic0`, `nic1`, ...) in kernel-name order.
    #[serde(default)]
    pub ordinal_name: String,
    pub driver: String,
    pub hardware_address: HardwareAddr,
    #[serde(default)]
    pub boot_interface: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    pub include_loopback: bool,
    pub boot_mac: Option<HardwareAddr>,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to run udevadm for {name}: {source}")]
    Udev {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("{name} has an unusable hardware address '{raw}'")]
    Address { name: String, raw: String },
    #[error("failed to parse snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_yaml::Error),
}

/// Walk `/sys/class/net` and describe every non-virtual NIC.
pub fn discover_physical_nics(opts: &DiscoveryOptions) -> Result<Vec<PhysicalNic>, DiscoveryError> {
    discover_in(Path::new(SYS_CLASS_NET), opts, udev_properties)
}

fn discover_in(
    root: &Path,
    opts: &DiscoveryOptions,
    udev: impl Fn(&Path) -> Result<String, io::Error>,
) -> Result<Vec<PhysicalNic>, DiscoveryError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| DiscoveryError::Io { path, source }
    };

    let mut nics = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err(root))? {
        let entry = entry.map_err(io_err(root))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let target = fs::read_link(&path).map_err(io_err(&path))?;
        let is_virtual = target.to_string_lossy().contains("/virtual/");
        if is_virtual && !(opts.include_loopback && name == "lo") {
            debug!(%name, "skipping virtual interface");
            continue;
        }

        let addr_path = path.join("address");
        let raw = fs::read_to_string(&addr_path).map_err(io_err(&addr_path))?;
        let raw = raw.trim();
        let hardware_address = match raw.parse::<HardwareAddr>() {
            Ok(addr) => addr,
            // loopback reports an all-zero six byte address
            Err(_) if raw.is_empty() => HardwareAddr::new(vec![0; 6]),
            Err(_) => {
                return Err(DiscoveryError::Address {
                    name,
                    raw: raw.to_string(),
                })
            }
        };

        let mut driver = fs::read_link(path.join("device/driver"))
            .ok()
            .and_then(|link| link.file_name().map(|f| f.to_string_lossy().into_owned()))
            .unwrap_or_default();
        let props = udev(&path).map_err(|source| DiscoveryError::Udev {
            name: name.clone(),
            source,
        })?;
        let (udev_driver, stable_name) = parse_udev(&props);
        if let Some(d) = udev_driver {
            driver = d;
        }

        nics.push(PhysicalNic {
            stable_name: stable_name.unwrap_or_else(|| name.clone()),
            name,
            ordinal_name: String::new(),
            driver,
            hardware_address,
            boot_interface: false,
        });
    }

    finish(&mut nics, opts);
    Ok(nics)
}

fn udev_properties(path: &Path) -> Result<String, io::Error> {
    let out = Command::new("udevadm")
        .args(["info", "-q", "all", "-p"])
        .arg(path)
        .output()?;
    if !out.status.success() {
        return Err(io::Error::other(format!(
            "udevadm exited with {}",
            out.status
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Pull the driver and the preferred stable name out of `udevadm info`
/// output.
fn parse_udev(props: &str) -> (Option<String>, Option<String>) {
    let mut driver = None;
    let mut names: [Option<String>; 3] = Default::default();
    for line in props.lines() {
        let Some(prop) = line.strip_prefix("E: ") else {
            continue;
        };
        let Some((key, value)) = prop.split_once('=') else {
            continue;
        };
        if key == "ID_NET_DRIVER" {
            driver = Some(value.to_string());
        } else if let Some(idx) = STABLE_NAME_KEYS.iter().position(|k| *k == key) {
            names[idx] = Some(value.to_string());
        }
    }
    (driver, names.into_iter().flatten().next())
}

/// Sort by kernel name, fill in missing ordinal names and flag the boot NIC.
fn finish(nics: &mut [PhysicalNic], opts: &DiscoveryOptions) {
    nics.sort_by(|a, b| a.name.cmp(&b.name));
    assign_ordinals(nics);
    if let Some(mac) = &opts.boot_mac {
        mark_boot(nics, mac);
    }
}

/// Give every NIC without one an ordinal name `nicN`, numbered by its
/// position in `nics`.
pub fn assign_ordinals(nics: &mut [PhysicalNic]) {
    for (idx, nic) in nics.iter_mut().enumerate() {
        if nic.ordinal_name.is_empty() {
            nic.ordinal_name = format!("nic{idx}");
        }
    }
}

/// Flag the NIC whose address is `mac` as the boot interface.
pub fn mark_boot(nics: &mut [PhysicalNic], mac: &HardwareAddr) {
    let mut found = false;
    for nic in nics.iter_mut() {
        nic.boot_interface = &nic.hardware_address == mac;
        found |= nic.boot_interface;
    }
    if !found {
        warn!(%mac, "no interface has the boot MAC address");
    }
}

/// Read a YAML snapshot previously produced by [`write_snapshot`].
pub fn load_snapshot(path: &Path, opts: &DiscoveryOptions) -> Result<Vec<PhysicalNic>, DiscoveryError> {
    let raw = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut nics: Vec<PhysicalNic> =
        serde_yaml::from_str(&raw).map_err(|source| DiscoveryError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
    finish(&mut nics, opts);
    Ok(nics)
}

pub fn write_snapshot(nics: &[PhysicalNic]) -> Result<String, DiscoveryError> {
    Ok(serde_yaml::to_string(nics)?)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::symlink;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::{discover_in, load_snapshot, parse_udev, write_snapshot, DiscoveryOptions};

    const UDEV: &str = "P: /devices/pci0000:00/0000:00:03.0/net/enp3s0\n\
E: ID_NET_NAME_PATH=enp0s3\n\
E: ID_NET_NAME_SLOT=ens3\n\
E: ID_NET_DRIVER=e1000e\n\
E: SUBSYSTEM=net\n";

    #[test]
    fn udev_prefers_slot_over_path() {
        let (driver, stable) = parse_udev(UDEV);
        assert_eq!(driver.as_deref(), Some("e1000e"));
        assert_eq!(stable.as_deref(), Some("ens3"));
        assert_eq!(parse_udev(""), (None, None));
    }

    #[test]
    fn walks_fake_sysfs_skipping_virtual() {
        let dir = tempdir().expect("tempdir");
        let devices = dir.path().join("devices");
        let class = dir.path().join("class");
        fs::create_dir_all(&class).expect("class");
        for (name, parent) in [("enp3s0", "pci0000:00"), ("eno1", "pci0000:00"), ("lo", "virtual")] {
            let dev = devices.join(parent).join("net").join(name);
            fs::create_dir_all(&dev).expect("dev");
            let mac = match name {
                "lo" => "00:00:00:00:00:00",
                "eno1" => "52:54:00:00:00:01",
                _ => "52:54:00:00:00:02",
            };
            fs::write(dev.join("address"), format!("{mac}\n")).expect("address");
            symlink(&dev, class.join(name)).expect("link");
        }

        let opts = DiscoveryOptions {
            boot_mac: Some("52:54:00:00:00:02".parse().expect("mac")),
            ..DiscoveryOptions::default()
        };
        let nics = discover_in(&class, &opts, |_| Ok(String::new())).expect("discover");
        let names: Vec<_> = nics.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["eno1", "enp3s0"]);
        assert_eq!(nics[1].ordinal_name, "nic1");
        assert_eq!(nics[1].stable_name, "enp3s0");
        assert!(nics[1].boot_interface);
        assert!(!nics[0].boot_interface);

        let opts = DiscoveryOptions {
            include_loopback: true,
            ..DiscoveryOptions::default()
        };
        let nics = discover_in(&class, &opts, |_| Ok(String::new())).expect("discover");
        assert_eq!(nics.len(), 3);
    }

    #[test]
    fn snapshot_fills_in_ordinals() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("phys.yaml");
        fs::write(
            &path,
            "- name: eth1\n  stable_name: ens4\n  driver: virtio_net\n  hardware_address: 52:54:00:00:00:02\n\
             - name: eth0\n  stable_name: ens3\n  driver: virtio_net\n  hardware_address: 52:54:00:00:00:01\n",
        )
        .expect("write");
        let nics = load_snapshot(&path, &DiscoveryOptions::default()).expect("load");
        assert_eq!(nics[0].name, "eth0");
        assert_eq!(nics[0].ordinal_name, "nic0");
        assert_eq!(nics[1].ordinal_name, "nic1");

        let dumped = write_snapshot(&nics).expect("dump");
        assert!(dumped.contains("ordinal_name: nic1"));
    }
}
