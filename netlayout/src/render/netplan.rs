//! Netplan v2 output for systemd-networkd.

use std::collections::BTreeMap;

use field_rules::Value;
use serde::Serialize;

use crate::addr::HardwareAddr;
use crate::graph::Graph;
use crate::model::{Interface, InterfaceKind};
use crate::network::Network;

use super::{RenderError, RenderedFiles, Renderer};

pub const NETPLAN_FILE: &str = "50-netlayout.yaml";

#[derive(Debug, Default)]
pub struct NetplanRenderer {
    bind_macs: bool,
}

impl NetplanRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Serialize)]
struct Document<'a> {
    network: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    version: u8,
    renderer: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    ethernets: BTreeMap<&'a str, Ether<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bonds: BTreeMap<&'a str, Link<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bridges: BTreeMap<&'a str, Link<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    vlans: BTreeMap<&'a str, Vlan<'a>>,
}

#[derive(Serialize)]
struct Common<'a> {
    #[serde(flatten)]
    network: Option<&'a Network>,
    #[serde(skip_serializing_if = "Option::is_none")]
    macaddress: Option<&'a HardwareAddr>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
}

impl<'a> Common<'a> {
    fn of(iface: &'a Interface) -> Self {
        Self {
            network: iface.network.as_ref().filter(|n| !n.is_default()),
            macaddress: iface.desired_hw_addr.as_ref(),
            optional: iface.optional,
        }
    }

    fn is_empty(&self) -> bool {
        self.network.is_none() && self.macaddress.is_none() && !self.optional
    }
}

#[derive(Serialize)]
struct Ether<'a> {
    #[serde(flatten)]
    common: Common<'a>,
    #[serde(rename = "match", skip_serializing_if = "BTreeMap::is_empty")]
    match_on: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    wakeonlan: bool,
}

#[derive(Serialize)]
struct Link<'a> {
    #[serde(flatten)]
    common: Common<'a>,
    #[serde(skip_serializing_if = "no_members")]
    interfaces: &'a [String],
    #[serde(skip_serializing_if = "no_parameters")]
    parameters: &'a BTreeMap<String, Value>,
}

fn no_members(members: &&[String]) -> bool {
    members.is_empty()
}

fn no_parameters(params: &&BTreeMap<String, Value>) -> bool {
    params.is_empty()
}

#[derive(Serialize)]
struct Vlan<'a> {
    #[serde(flatten)]
    common: Common<'a>,
    id: i64,
    link: &'a str,
}

impl NetplanRenderer {
    fn ether<'a>(&self, iface: &'a Interface) -> Ether<'a> {
        let mut common = Common::of(iface);
        // renaming is unsupported, physical nodes never carry a desired address
        common.macaddress = None;
        let mut match_on = BTreeMap::new();
        if self.bind_macs {
            if let Some(mac) = &iface.current_hw_addr {
                match_on.insert("macaddress", mac.to_string());
            }
        }
        let wakeonlan = iface
            .parameters
            .get("wakeonlan")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ether {
            common,
            match_on,
            wakeonlan,
        }
    }

    fn vlan<'a>(iface: &'a Interface) -> Result<Vlan<'a>, RenderError> {
        let invalid = |reason: &str| RenderError::Interface {
            name: iface.name.clone(),
            reason: reason.to_string(),
        };
        let id = iface
            .parameters
            .get("id")
            .and_then(Value::as_int)
            .ok_or_else(|| invalid("vlan has no id"))?;
        let link = iface
            .members
            .first()
            .ok_or_else(|| invalid("vlan has no link"))?;
        Ok(Vlan {
            common: Common::of(iface),
            id,
            link,
        })
    }
}

impl Renderer for NetplanRenderer {
    fn bind_physical_addressing(&mut self) {
        self.bind_macs = true;
    }

    fn render(&self, graph: &Graph) -> Result<RenderedFiles, RenderError> {
        let mut body = Body {
            version: 2,
            renderer: "networkd",
            ethernets: BTreeMap::new(),
            bonds: BTreeMap::new(),
            bridges: BTreeMap::new(),
            vlans: BTreeMap::new(),
        };
        for (name, iface) in &graph.interfaces {
            let name = name.as_str();
            match iface.kind {
                InterfaceKind::Physical => {
                    let ether = self.ether(iface);
                    // members must stay declared even when there is nothing to say
                    let elide = ether.common.is_empty()
                        && ether.match_on.is_empty()
                        && !ether.wakeonlan
                        && graph.parents(name).is_empty();
                    if !elide {
                        body.ethernets.insert(name, ether);
                    }
                }
                InterfaceKind::Bond | InterfaceKind::Bridge => {
                    let link = Link {
                        common: Common::of(iface),
                        interfaces: &iface.members,
                        parameters: &iface.parameters,
                    };
                    if iface.kind == InterfaceKind::Bond {
                        body.bonds.insert(name, link);
                    } else {
                        body.bridges.insert(name, link);
                    }
                }
                InterfaceKind::Vlan => {
                    body.vlans.insert(name, Self::vlan(iface)?);
                }
            }
        }

        let text = serde_yaml::to_string(&Document { network: body }).map_err(|source| {
            RenderError::Encode {
                file: NETPLAN_FILE.to_string(),
                source,
            }
        })?;
        Ok(RenderedFiles::from([(NETPLAN_FILE.to_string(), text)]))
    }
}
