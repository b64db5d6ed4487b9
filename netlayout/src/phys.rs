//! Resolving ethernet match specifications against discovered NICs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::addr::HardwareAddr;
use crate::discovery::PhysicalNic;
use crate::model::{Interface, InterfaceKind};

/// Filter selecting physical NICs. All fields absent means "match the
/// declaration key as a name".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(
        rename = "macaddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mac_address: Option<HardwareAddr>,
}

impl MatchSpec {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.driver.is_none() && self.mac_address.is_none()
    }
}

#[derive(Debug, Error)]
#[error("invalid match pattern '{pattern}': {source}")]
pub struct MatchError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Compile a shell-style glob into an anchored regex.
///
/// Only `*` and `?` are special. A pattern starting with `^` is taken as a
/// raw regular expression.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, MatchError> {
    let source = if pattern.starts_with('^') {
        pattern.to_string()
    } else {
        let escaped = regex::escape(pattern)
            .replace(r"\*", ".*")
            .replace(r"\?", ".");
        format!("^{escaped}$")
    };
    Regex::new(&source).map_err(|source| MatchError {
        pattern: pattern.to_string(),
        source,
    })
}

/// Return every candidate selected by `spec`, stamped from `template` as a
/// physical node named after the NIC.
///
/// A name equal to `boot_token` selects only the NIC flagged as the boot
/// interface; the driver and MAC filters still apply to it.
pub fn match_phys(
    spec: &MatchSpec,
    template: &Interface,
    candidates: &[PhysicalNic],
    boot_token: &str,
) -> Result<Vec<Interface>, MatchError> {
    let boot_only = spec.name.as_deref() == Some(boot_token);
    let name_re = match &spec.name {
        Some(name) if !boot_only => Some(glob_to_regex(name)?),
        _ => None,
    };
    let driver_re = spec.driver.as_deref().map(glob_to_regex).transpose()?;

    let mut out = Vec::new();
    for nic in candidates {
        if boot_only && !nic.boot_interface {
            continue;
        }
        if let Some(re) = &name_re {
            let hit = re.is_match(&nic.name)
                || re.is_match(&nic.stable_name)
                || (!nic.ordinal_name.is_empty() && re.is_match(&nic.ordinal_name));
            if !hit {
                continue;
            }
        }
        if let Some(re) = &driver_re {
            if !re.is_match(&nic.driver) {
                continue;
            }
        }
        if let Some(mac) = &spec.mac_address {
            if mac.as_bytes() != nic.hardware_address.as_bytes() {
                continue;
            }
        }
        debug!(nic = %nic.name, match_id = %template.match_id, "matched physical interface");
        let mut iface = template.clone();
        iface.kind = InterfaceKind::Physical;
        iface.name = nic.name.clone();
        iface.current_hw_addr = Some(nic.hardware_address.clone());
        out.push(iface);
    }
    Ok(out)
}
