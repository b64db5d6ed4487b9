//! RHEL network-scripts output: `ifcfg-<name>` per interface, with
//! `route-`, `rule-` and `rule6-` companions when the interface has static
//! routes or routing policy.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use field_rules::Value;

use crate::addr::IpNet;
use crate::graph::Graph;
use crate::model::{Interface, InterfaceKind};
use crate::network::{Network, Route, RoutePolicy, RouteScope, RouteType};

use super::{flat_value, RenderError, RenderedFiles, Renderer};

#[derive(Debug, Default)]
pub struct IfcfgRenderer {
    bind_macs: bool,
}

impl IfcfgRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shell-style `KEY="value"` lines.
struct Ifcfg(String);

impl Ifcfg {
    fn new() -> Self {
        Self("# Created by netlayout\n".to_string())
    }

    fn set(&mut self, key: &str, value: impl Display) {
        self.0.push_str(&format!("{key}=\"{value}\"\n"));
    }
}

/// Kernel bonding option name for a bond parameter.
fn bond_option(param: &str) -> String {
    match param {
        "arp-ip-targets" => "arp_ip_target".to_string(),
        "down-delay" => "downdelay".to_string(),
        "fail-over-mac-policy" => "fail_over_mac".to_string(),
        "gratuitous-arp" => "num_grat_arp".to_string(),
        "mii-monitor-interval" => "miimon".to_string(),
        "primary-reselect-policy" => "primary_reselect".to_string(),
        "transmit-hash-policy" => "xmit_hash_policy".to_string(),
        "up-delay" => "updelay".to_string(),
        other => other.replace('-', "_"),
    }
}

fn bonding_opts(iface: &Interface) -> String {
    let mut opts: Vec<String> = iface
        .parameters
        .iter()
        .map(|(param, value)| {
            let value = match value {
                Value::Bool(b) => u8::from(*b).to_string(),
                other => flat_value(other, ","),
            };
            format!("{}={value}", bond_option(param))
        })
        .collect();
    opts.sort();
    opts.join(" ")
}

fn netmask(prefix: u8) -> Ipv4Addr {
    let bits = u32::MAX
        .checked_shl(32 - u32::from(prefix.min(32)))
        .unwrap_or(0);
    Ipv4Addr::from(bits)
}

/// `ip route add` arguments for `route` on `dev`.
fn route_args(route: &Route, dev: &str) -> String {
    let mut args = Vec::new();
    if let Some(to) = &route.to {
        args.push("to".to_string());
        if route.kind != RouteType::Unicast {
            args.push(route.kind.as_str().to_string());
        }
        args.push(to.to_string());
    }
    if let Some(from) = &route.from {
        args.extend(["src".to_string(), from.to_string()]);
    }
    if let Some(metric) = route.metric.filter(|m| *m != 100) {
        args.extend(["metric".to_string(), metric.to_string()]);
    }
    if let Some(table) = route.table.filter(|t| *t != 253) {
        args.extend(["table".to_string(), table.to_string()]);
    }
    if let Some(via) = &route.via {
        args.extend(["via".to_string(), via.addr.to_string()]);
    }
    if route.on_link {
        args.push("onlink".to_string());
    }
    if let Some(scope) = route.scope.filter(|s| *s != RouteScope::Global) {
        args.extend(["scope".to_string(), scope.as_str().to_string()]);
    }
    args.extend(["dev".to_string(), dev.to_string()]);
    args.join(" ")
}

/// `ip rule add` arguments for `policy`.
fn rule_args(policy: &RoutePolicy) -> String {
    let mut args = Vec::new();
    if let Some(from) = &policy.from {
        args.extend(["from".to_string(), from.to_string()]);
    }
    if let Some(to) = &policy.to {
        args.extend(["to".to_string(), to.to_string()]);
    }
    if let Some(priority) = policy.priority {
        args.extend(["pref".to_string(), priority.to_string()]);
    }
    if let Some(mark) = policy.mark {
        args.extend(["fwmark".to_string(), mark.to_string()]);
    }
    if let Some(tos) = policy.type_of_service {
        args.extend(["tos".to_string(), tos.to_string()]);
    }
    if let Some(table) = policy.table {
        args.extend(["table".to_string(), table.to_string()]);
    }
    args.join(" ")
}

impl IfcfgRenderer {
    fn interface(
        &self,
        graph: &Graph,
        iface: &Interface,
        files: &mut RenderedFiles,
    ) -> Result<(), RenderError> {
        let invalid = |reason: &str| RenderError::Interface {
            name: iface.name.clone(),
            reason: reason.to_string(),
        };
        let mut cfg = Ifcfg::new();
        cfg.set("DEVICE", &iface.name);
        match iface.kind {
            InterfaceKind::Physical => {
                cfg.set("TYPE", "Ethernet");
                if self.bind_macs {
                    let mac = iface
                        .current_hw_addr
                        .as_ref()
                        .ok_or_else(|| invalid("no hardware address to bind"))?;
                    cfg.set("HWADDR", mac);
                }
            }
            InterfaceKind::Bond => {
                cfg.set("TYPE", "Bond");
                cfg.set("BONDING_MASTER", "yes");
                cfg.set("BONDING_OPTS", bonding_opts(iface));
            }
            InterfaceKind::Bridge => {
                cfg.set("TYPE", "Bridge");
                if let Some(stp) = iface.parameters.get("stp").and_then(Value::as_bool) {
                    cfg.set("STP", if stp { "yes" } else { "no" });
                    let delay = iface.parameters.get("forward-delay").and_then(Value::as_int);
                    if let Some(delay) = delay.filter(|_| stp) {
                        cfg.set("DELAY", delay);
                    }
                }
            }
            InterfaceKind::Vlan => {
                let id = iface
                    .parameters
                    .get("id")
                    .and_then(Value::as_int)
                    .ok_or_else(|| invalid("vlan has no id"))?;
                let link = iface.members.first().ok_or_else(|| invalid("vlan has no link"))?;
                cfg.set("VLAN", "yes");
                cfg.set("VID", id);
                cfg.set("PHYSDEV", link);
            }
        }
        if let Some(mac) = &iface.desired_hw_addr {
            cfg.set("MACADDR", mac);
        }
        for parent in graph.parents(&iface.name) {
            match graph.get(parent).map(|p| p.kind) {
                Some(InterfaceKind::Bridge) => cfg.set("BRIDGE", parent),
                Some(InterfaceKind::Bond) => {
                    cfg.set("MASTER", parent);
                    cfg.set("SLAVE", "yes");
                }
                _ => {}
            }
        }
        cfg.set("ONBOOT", if iface.optional { "no" } else { "yes" });

        if let Some(network) = iface.network.as_ref().filter(|n| n.configure()) {
            self.network(&iface.name, network, &mut cfg, files);
        }
        files.insert(format!("ifcfg-{}", iface.name), cfg.0);
        Ok(())
    }

    fn network(&self, dev: &str, n: &Network, cfg: &mut Ifcfg, files: &mut RenderedFiles) {
        let (v4, v6): (Vec<&IpNet>, Vec<&IpNet>) = n.addresses.iter().partition(|a| a.is_ipv4());
        cfg.set("BOOTPROTO", if n.dhcp4 { "dhcp" } else { "none" });
        if let Some(ns) = &n.nameservers {
            for (idx, addr) in ns.addresses.iter().take(2).enumerate() {
                cfg.set(&format!("DNS{}", idx + 1), addr);
            }
            if !ns.search.is_empty() {
                cfg.set("DOMAIN", ns.search.join(" "));
            }
        }
        for (idx, addr) in v4.iter().enumerate() {
            cfg.set(&format!("IPADDR{idx}"), addr.addr);
            cfg.set(&format!("NETMASK{idx}"), netmask(addr.prefix.unwrap_or(32)));
        }
        if let Some(gw) = &n.gateway4 {
            cfg.set("GATEWAY", gw.addr);
        }
        if !v6.is_empty() || n.dhcp6 || n.accept_ra {
            cfg.set("IPV6INIT", "yes");
        }
        if n.accept_ra {
            cfg.set("IPV6_AUTOCONF", "yes");
        }
        if n.dhcp6 {
            cfg.set("DHCPV6C", "yes");
        }
        if let Some((first, rest)) = v6.split_first() {
            cfg.set("IPV6ADDR", first);
            if !rest.is_empty() {
                let rest: Vec<String> = rest.iter().map(|a| a.to_string()).collect();
                cfg.set("IPV6ADDR_SECONDARIES", rest.join(" "));
            }
        }

        let mut routes: Vec<String> = n.routes.iter().map(|r| route_args(r, dev)).collect();
        if let Some(gw) = &n.gateway6 {
            let default_v6 = Route {
                to: Some(IpNet {
                    addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                    prefix: Some(0),
                }),
                via: Some(*gw),
                ..Route::default()
            };
            routes.push(route_args(&default_v6, dev));
        }
        if !routes.is_empty() {
            files.insert(format!("route-{dev}"), lines(&routes));
        }

        let selector = |p: &RoutePolicy| p.from.or(p.to);
        let (rules4, rules6): (Vec<&RoutePolicy>, Vec<&RoutePolicy>) = n
            .routing_policy
            .iter()
            .filter(|p| selector(*p).is_some())
            .partition(|p| selector(*p).is_some_and(|ip| ip.is_ipv4()));
        for (prefix, rules) in [("rule", rules4), ("rule6", rules6)] {
            if !rules.is_empty() {
                let args: Vec<String> = rules.into_iter().map(rule_args).collect();
                files.insert(format!("{prefix}-{dev}"), lines(&args));
            }
        }
    }
}

fn lines(items: &[String]) -> String {
    let mut out = items.join("\n");
    out.push('\n');
    out
}

impl Renderer for IfcfgRenderer {
    fn bind_physical_addressing(&mut self) {
        self.bind_macs = true;
    }

    fn render(&self, graph: &Graph) -> Result<RenderedFiles, RenderError> {
        let mut files = RenderedFiles::new();
        for iface in graph.interfaces.values() {
            self.interface(graph, iface, &mut files)?;
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use field_rules::Value;
    use pretty_assertions::assert_eq;

    use super::{netmask, IfcfgRenderer};
    use crate::graph::Graph;
    use crate::model::{Interface, InterfaceKind};
    use crate::network::{Network, Nameservers, Route, RoutePolicy};
    use crate::render::Renderer;

    fn ip(s: &str) -> crate::addr::IpNet {
        s.parse().expect("ip")
    }

    fn sample() -> Graph {
        let mut graph = Graph::new();
        for (name, mac) in [("eth0", "52:54:00:00:00:01"), ("eth1", "52:54:00:00:00:02")] {
            let mut nic = Interface::new(InterfaceKind::Physical, name, name);
            nic.current_hw_addr = Some(mac.parse().expect("mac"));
            graph.insert(nic).expect("nic");
        }
        let mut bond = Interface::new(InterfaceKind::Bond, "bond0", "bond0");
        bond.members = vec!["eth0".to_string(), "eth1".to_string()];
        bond.parameters
            .insert("mode".to_string(), Value::from("802.3ad"));
        bond.parameters
            .insert("mii-monitor-interval".to_string(), Value::Int(100));
        bond.parameters
            .insert("all-slaves-active".to_string(), Value::Bool(true));
        graph.insert(bond).expect("bond");

        let mut vlan = Interface::new(InterfaceKind::Vlan, "vlan10", "vlan10");
        vlan.members = vec!["bond0".to_string()];
        vlan.parameters.insert("id".to_string(), Value::Int(10));
        vlan.network = Some(Network {
            addresses: vec![ip("192.0.2.10/24"), ip("2001:db8::10/64")],
            gateway4: Some(ip("192.0.2.1")),
            gateway6: Some(ip("2001:db8::1")),
            nameservers: Some(Nameservers {
                search: vec!["example.net".to_string()],
                addresses: vec![ip("192.0.2.53"), ip("192.0.2.54"), ip("192.0.2.55")],
            }),
            routes: vec![Route {
                to: Some(ip("198.51.100.0/24")),
                via: Some(ip("192.0.2.254")),
                metric: Some(100),
                table: Some(7),
                ..Route::default()
            }],
            routing_policy: vec![
                RoutePolicy {
                    from: Some(ip("192.0.2.0/24")),
                    table: Some(7),
                    ..RoutePolicy::default()
                },
                RoutePolicy {
                    to: Some(ip("2001:db8:1::/48")),
                    priority: Some(10),
                    ..RoutePolicy::default()
                },
            ],
            ..Network::default()
        });
        graph.insert(vlan).expect("vlan");
        graph.validate().expect("valid");
        graph
    }

    #[test]
    fn bonds_carry_kernel_option_names() {
        let files = IfcfgRenderer::new().render(&sample()).expect("render");
        assert_eq!(
            files["ifcfg-bond0"],
            "# Created by netlayout\nDEVICE=\"bond0\"\nTYPE=\"Bond\"\nBONDING_MASTER=\"yes\"\n\
             BONDING_OPTS=\"all_slaves_active=1 miimon=100 mode=802.3ad\"\nONBOOT=\"yes\"\n"
        );
        assert_eq!(
            files["ifcfg-eth0"],
            "# Created by netlayout\nDEVICE=\"eth0\"\nTYPE=\"Ethernet\"\nMASTER=\"bond0\"\n\
             SLAVE=\"yes\"\nONBOOT=\"yes\"\n"
        );
    }

    #[test]
    fn vlan_addressing_routes_and_rules() {
        let files = IfcfgRenderer::new().render(&sample()).expect("render");
        let vlan = &files["ifcfg-vlan10"];
        for line in [
            "VLAN=\"yes\"",
            "VID=\"10\"",
            "PHYSDEV=\"bond0\"",
            "BOOTPROTO=\"none\"",
            "DNS1=\"192.0.2.53\"",
            "DNS2=\"192.0.2.54\"",
            "DOMAIN=\"example.net\"",
            "IPADDR0=\"192.0.2.10\"",
            "NETMASK0=\"255.255.255.0\"",
            "GATEWAY=\"192.0.2.1\"",
            "IPV6INIT=\"yes\"",
            "IPV6ADDR=\"2001:db8::10/64\"",
        ] {
            assert!(vlan.contains(line), "missing {line} in\n{vlan}");
        }
        assert!(!vlan.contains("DNS3"));
        assert_eq!(
            files["route-vlan10"],
            "to 198.51.100.0/24 table 7 via 192.0.2.254 dev vlan10\n\
             to ::/0 via 2001:db8::1 dev vlan10\n"
        );
        assert_eq!(files["rule-vlan10"], "from 192.0.2.0/24 table 7\n");
        assert_eq!(files["rule6-vlan10"], "to 2001:db8:1::/48 pref 10\n");
    }

    #[test]
    fn unconfigured_interfaces_get_no_addressing() {
        let mut renderer = IfcfgRenderer::new();
        renderer.bind_physical_addressing();
        let files = renderer.render(&sample()).expect("render");
        assert!(files["ifcfg-eth1"].contains("HWADDR=\"52:54:00:00:00:02\""));
        assert!(!files["ifcfg-eth1"].contains("BOOTPROTO"));
        assert!(!files.contains_key("route-bond0"));
    }

    #[test]
    fn netmask_from_prefix() {
        assert_eq!(netmask(24).to_string(), "255.255.255.0");
        assert_eq!(netmask(0).to_string(), "0.0.0.0");
        assert_eq!(netmask(32).to_string(), "255.255.255.255");
    }
}
