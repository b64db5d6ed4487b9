//! systemd-networkd output: one `.network` file per interface, plus a
//! `.netdev` for every virtual device and a `.link` for physical NICs that
//! need link-level settings.

use std::collections::BTreeMap;

use field_rules::Value;

use crate::graph::Graph;
use crate::model::{Interface, InterfaceKind};
use crate::network::{DhcpOverrides, Network, Route, RoutePolicy};

use super::{flat_value, RenderError, RenderedFiles, Renderer};

const PRIORITY: u8 = 60;

/// Bond parameter to `[Bond]` key, in output order.
const BOND_KEYS: [(&str, &str); 19] = [
    ("mode", "Mode"),
    ("transmit-hash-policy", "TransmitHashPolicy"),
    ("lacp-rate", "LACPTransmitRate"),
    ("mii-monitor-interval", "MIIMonitorSec"),
    ("min-links", "MinLinks"),
    ("ad-select", "AdSelect"),
    ("all-slaves-active", "AllSlavesActive"),
    ("arp-interval", "ARPIntervalSec"),
    ("arp-ip-targets", "ARPIPTargets"),
    ("arp-validate", "ARPValidate"),
    ("arp-all-targets", "ARPAllTargets"),
    ("up-delay", "UpDelaySec"),
    ("down-delay", "DownDelaySec"),
    ("fail-over-mac-policy", "FailOverMACPolicy"),
    ("gratuitous-arp", "GratuitousARP"),
    ("packets-per-slave", "PacketsPerSlave"),
    ("primary-reselect-policy", "PrimaryReselectPolicy"),
    ("resend-igmp", "ResendIGMP"),
    ("learn-packet-interval", "LearnPacketIntervalSec"),
];

const BRIDGE_KEYS: [(&str, &str); 6] = [
    ("stp", "STP"),
    ("max-age", "MaxAgeSec"),
    ("hello-time", "HelloTimeSec"),
    ("forward-delay", "ForwardDelaySec"),
    ("ageing-time", "AgeingTimeSec"),
    ("priority", "Priority"),
];

#[derive(Debug, Default)]
pub struct NetworkdRenderer {
    bind_macs: bool,
}

impl NetworkdRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Minimal INI writer.
#[derive(Default)]
struct Unit(String);

impl Unit {
    fn section(&mut self, name: &str) {
        if !self.0.is_empty() {
            self.0.push('\n');
        }
        self.0.push_str(&format!("[{name}]\n"));
    }

    fn set(&mut self, key: &str, value: impl std::fmt::Display) {
        self.0.push_str(&format!("{key}={value}\n"));
    }
}

fn file_name(name: &str, ext: &str) -> String {
    format!("{PRIORITY:02}-{name}.{ext}")
}

fn write_params(unit: &mut Unit, keys: &[(&str, &str)], params: &BTreeMap<String, Value>) {
    for (param, key) in keys {
        if let Some(value) = params.get(*param) {
            unit.set(key, flat_value(value, " "));
        }
    }
}

impl NetworkdRenderer {
    fn netdev(iface: &Interface) -> Result<Option<(String, Unit)>, RenderError> {
        let mut unit = Unit::default();
        match iface.kind {
            InterfaceKind::Physical => {
                let wake = iface
                    .parameters
                    .get("wakeonlan")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if !wake {
                    return Ok(None);
                }
                let mac = iface.current_hw_addr.as_ref().ok_or_else(|| {
                    RenderError::Interface {
                        name: iface.name.clone(),
                        reason: "wake-on-LAN needs a hardware address".to_string(),
                    }
                })?;
                unit.section("Match");
                unit.set("MACAddress", mac);
                unit.section("Link");
                unit.set("MACAddressPolicy", "persistent");
                unit.set("WakeOnLan", "magic");
                return Ok(Some((file_name(&iface.name, "link"), unit)));
            }
            InterfaceKind::Bond => {
                unit.section("NetDev");
                unit.set("Name", &iface.name);
                unit.set("Kind", "bond");
                unit.section("Bond");
                write_params(&mut unit, &BOND_KEYS, &iface.parameters);
            }
            InterfaceKind::Bridge => {
                unit.section("NetDev");
                unit.set("Name", &iface.name);
                unit.set("Kind", "bridge");
                unit.section("Bridge");
                write_params(&mut unit, &BRIDGE_KEYS, &iface.parameters);
            }
            InterfaceKind::Vlan => {
                let id = iface
                    .parameters
                    .get("id")
                    .and_then(Value::as_int)
                    .ok_or_else(|| RenderError::Interface {
                        name: iface.name.clone(),
                        reason: "vlan has no id".to_string(),
                    })?;
                unit.section("NetDev");
                unit.set("Name", &iface.name);
                unit.set("Kind", "vlan");
                unit.section("VLAN");
                unit.set("Id", id);
            }
        }
        Ok(Some((file_name(&iface.name, "netdev"), unit)))
    }

    fn network(&self, graph: &Graph, iface: &Interface) -> Result<Unit, RenderError> {
        let mut unit = Unit::default();
        unit.section("Match");
        match (&iface.current_hw_addr, iface.kind) {
            (Some(mac), InterfaceKind::Physical) if self.bind_macs => unit.set("MACAddress", mac),
            _ => unit.set("Name", &iface.name),
        }
        if iface.optional || iface.desired_hw_addr.is_some() {
            unit.section("Link");
            if iface.optional {
                unit.set("RequiredForOnline", "no");
            }
            if let Some(mac) = &iface.desired_hw_addr {
                unit.set("MACAddress", mac);
            }
        }

        unit.section("Network");
        for parent_name in graph.parents(&iface.name) {
            let Some(parent) = graph.get(parent_name) else {
                continue;
            };
            match parent.kind {
                InterfaceKind::Bridge => unit.set("Bridge", parent_name),
                InterfaceKind::Bond => {
                    unit.set("Bond", parent_name);
                    let primary = parent.parameters.get("primary").and_then(Value::as_str);
                    if primary == Some(iface.name.as_str()) {
                        unit.set("PrimarySlave", "true");
                    }
                }
                InterfaceKind::Vlan => unit.set("VLAN", parent_name),
                InterfaceKind::Physical => {
                    return Err(RenderError::Interface {
                        name: iface.name.clone(),
                        reason: format!("physical interface {parent_name} cannot be a parent"),
                    })
                }
            }
        }
        if let Some(network) = &iface.network {
            write_network(&mut unit, network);
        }
        Ok(unit)
    }
}

fn write_network(unit: &mut Unit, n: &Network) {
    match (n.dhcp4, n.dhcp6) {
        (true, true) => unit.set("DHCP", "yes"),
        (true, false) => unit.set("DHCP", "ipv4"),
        (false, true) => unit.set("DHCP", "ipv6"),
        (false, false) => {}
    }
    unit.set("IPv6AcceptRA", n.accept_ra);
    for addr in &n.addresses {
        unit.set("Address", addr);
    }
    for gw in n.gateway4.iter().chain(n.gateway6.iter()) {
        unit.set("Gateway", gw);
    }
    if let Some(ns) = &n.nameservers {
        for dns in &ns.addresses {
            unit.set("DNS", dns);
        }
        if !ns.search.is_empty() {
            unit.set("Domains", ns.search.join(" "));
        }
    }

    if let Some(id) = &n.dhcp_identifier {
        unit.section("DHCP");
        unit.set("ClientIdentifier", id);
    }
    for route in &n.routes {
        write_route(unit, route);
    }
    for policy in &n.routing_policy {
        write_route_policy(unit, policy);
    }
    if let Some(o) = &n.dhcp4_overrides {
        unit.section("DHCPv4");
        write_overrides(unit, o);
    }
    if let Some(o) = &n.dhcp6_overrides {
        unit.section("DHCPv6");
        unit.set("UseDNS", o.use_dns);
        unit.set("UseNTP", o.use_ntp);
    }
}

fn write_overrides(unit: &mut Unit, o: &DhcpOverrides) {
    unit.set("SendHostname", o.send_hostname);
    if let Some(hostname) = &o.hostname {
        unit.set("Hostname", hostname);
    }
    unit.set("UseDNS", o.use_dns);
    unit.set("UseNTP", o.use_ntp);
    unit.set("UseMTU", o.use_mtu);
    unit.set("UseDomains", &o.use_domains);
    unit.set("UseRoutes", o.use_routes);
    if let Some(metric) = o.route_metric {
        unit.set("RouteMetric", metric);
    }
}

fn write_route(unit: &mut Unit, r: &Route) {
    unit.section("Route");
    if let Some(from) = &r.from {
        unit.set("Source", from);
    }
    if let Some(to) = &r.to {
        unit.set("Destination", to);
    }
    if let Some(via) = &r.via {
        unit.set("Gateway", via);
    }
    if r.on_link {
        unit.set("GatewayOnLink", "yes");
    }
    if let Some(metric) = r.metric {
        unit.set("Metric", metric);
    }
    unit.set("Type", r.kind.as_str());
    if let Some(scope) = r.scope {
        unit.set("Scope", scope.as_str());
    }
    if let Some(table) = r.table {
        unit.set("Table", table);
    }
}

fn write_route_policy(unit: &mut Unit, r: &RoutePolicy) {
    unit.section("RoutingPolicyRule");
    if let Some(from) = &r.from {
        unit.set("From", from);
    }
    if let Some(to) = &r.to {
        unit.set("To", to);
    }
    if let Some(table) = r.table {
        unit.set("Table", table);
    }
    if let Some(priority) = r.priority {
        unit.set("Priority", priority);
    }
    if let Some(mark) = r.mark {
        unit.set("FirewallMark", mark);
    }
    if let Some(tos) = r.type_of_service {
        unit.set("TypeOfService", tos);
    }
}

impl Renderer for NetworkdRenderer {
    fn bind_physical_addressing(&mut self) {
        self.bind_macs = true;
    }

    fn render(&self, graph: &Graph) -> Result<RenderedFiles, RenderError> {
        let mut files = RenderedFiles::new();
        for iface in graph.interfaces.values() {
            if let Some((name, unit)) = Self::netdev(iface)? {
                files.insert(name, unit.0);
            }
            let unit = self.network(graph, iface)?;
            files.insert(file_name(&iface.name, "network"), unit.0);
        }
        Ok(files)
    }
}
