use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use field_rules::Value;
use serde::Serialize;

use crate::addr::HardwareAddr;
use crate::network::Network;

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Physical,
    Bond,
    Bridge,
    Vlan,
}

impl InterfaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceKind::Physical => "physical",
            InterfaceKind::Bond => "bond",
            InterfaceKind::Bridge => "bridge",
            InterfaceKind::Vlan => "vlan",
        }
    }

    /// Kinds whose members hand their addressing to the parent.
    pub fn owns_members(self) -> bool {
        matches!(self, InterfaceKind::Bond | InterfaceKind::Bridge)
    }
}

impl Display for InterfaceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the interface graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interface {
    #[serde(rename = "type")]
    pub kind: InterfaceKind,
    /// Declaration key this node came from.
    pub match_id: String,
    pub name: String,
    #[serde(rename = "hwaddr", skip_serializing_if = "Option::is_none")]
    pub current_hw_addr: Option<HardwareAddr>,
    #[serde(rename = "macaddress", skip_serializing_if = "Option::is_none")]
    pub desired_hw_addr: Option<HardwareAddr>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Names of the nodes this one is built on.
    #[serde(rename = "interfaces", skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
}

impl Interface {
    pub fn new(kind: InterfaceKind, match_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            match_id: match_id.into(),
            name: name.into(),
            current_hw_addr: None,
            desired_hw_addr: None,
            optional: false,
            members: Vec::new(),
            parameters: BTreeMap::new(),
            network: None,
        }
    }

    /// Diagnostic prefix, e.g. `bond:bond0`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind, self.match_id)
    }
}
