//! Per-kind declaration parsers.
//!
//! Each parser checks the declaration's keys (kind fields plus layer-3
//! fields) in a single strict pass, then decodes the checked table into an
//! [`Interface`]. A declaration with any bad field is rejected as a whole;
//! the returned [`Errs`] carries every problem found in it.

use field_rules::checkers::{
    boolean, c, d, int_in, list_of, nested, str_in, str_list, string, unsupported,
};
use field_rules::{Checked, Errs, Rules, Value};
use serde::Deserialize;
use tracing::debug;

use crate::addr::HardwareAddr;
use crate::checks::{ip, ip_list, ipv4, ipv6, mac};
use crate::model::{Interface, InterfaceKind};
use crate::network::Network;
use crate::phys::MatchSpec;

const U32_MAX: i64 = u32::MAX as i64;

/// A parsed ethernet declaration, not yet resolved to NICs.
#[derive(Debug, Clone)]
pub struct EthernetDecl {
    pub match_spec: MatchSpec,
    /// Node every matched NIC is stamped from.
    pub template: Interface,
}

#[derive(Deserialize)]
struct EthernetFields {
    #[serde(rename = "match", default)]
    match_spec: MatchSpec,
    #[serde(default)]
    wakeonlan: bool,
    #[serde(default)]
    optional: bool,
}

#[derive(Deserialize)]
struct LinkFields {
    #[serde(rename = "macaddress", default)]
    mac_address: Option<HardwareAddr>,
    #[serde(default)]
    interfaces: Vec<String>,
    #[serde(default)]
    optional: bool,
}

pub fn parse_ethernet(key: &str, raw: &Value) -> Result<EthernetDecl, Errs> {
    let mut errs = Errs::new(format!("ethernet:{key}"));
    let rules = Rules::new()
        .field("match", c(nested(match_rules())))
        .field("wakeonlan", d(false, boolean()))
        .field("optional", d(false, boolean()))
        .field("set-name", c(unsupported()))
        .field("macaddress", c(unsupported()))
        .extend(network_rules());

    let Some(checked) = rules.validate(&mut errs, raw) else {
        errs.push(format!("{} not castable to an ethernet interface", raw.kind()));
        return Err(errs);
    };
    let fields: Option<EthernetFields> = checked.decode(&mut errs);
    let network: Option<Network> = checked.decode(&mut errs);
    let (Some(fields), Some(network)) = (fields, network) else {
        return Err(errs);
    };

    let mut template = Interface::new(InterfaceKind::Physical, key, key);
    template.optional = fields.optional;
    if fields.wakeonlan {
        template
            .parameters
            .insert("wakeonlan".to_string(), Value::Bool(true));
    }
    template.network = Some(network);
    debug!(%key, "parsed ethernet declaration");
    Ok(EthernetDecl {
        match_spec: fields.match_spec,
        template,
    })
}

pub fn parse_bond(key: &str, raw: &Value) -> Result<Interface, Errs> {
    parse_link(InterfaceKind::Bond, key, raw, bond_parameters)
}

pub fn parse_bridge(key: &str, raw: &Value) -> Result<Interface, Errs> {
    parse_link(InterfaceKind::Bridge, key, raw, bridge_parameters)
}

/// Shared parser for bonds and bridges.
fn parse_link(
    kind: InterfaceKind,
    key: &str,
    raw: &Value,
    parameters: fn() -> Rules,
) -> Result<Interface, Errs> {
    let mut errs = Errs::new(format!("{kind}:{key}"));
    let rules = Rules::new()
        .field("macaddress", c(mac()))
        .field("interfaces", c(str_list()))
        .field("parameters", c(nested(parameters())))
        .field("optional", d(false, boolean()))
        .extend(network_rules());

    let Some(mut checked) = rules.validate(&mut errs, raw) else {
        errs.push(format!("{} not castable to a {kind} interface", raw.kind()));
        return Err(errs);
    };
    // Absent parameters still get their defaults.
    let params = match checked.take("parameters") {
        Some(Value::Map(map)) => map,
        _ => parameters()
            .validate(&mut errs, &Value::Null)
            .map(Checked::into_map)
            .unwrap_or_default(),
    };
    let fields: Option<LinkFields> = checked.decode(&mut errs);
    let network: Option<Network> = checked.decode(&mut errs);
    let (Some(fields), Some(network)) = (fields, network) else {
        return Err(errs);
    };

    let mut iface = Interface::new(kind, key, key);
    iface.desired_hw_addr = fields.mac_address;
    iface.members = fields.interfaces;
    iface.optional = fields.optional;
    iface.parameters = params;
    iface.network = Some(network);
    debug!(%kind, %key, members = iface.members.len(), "parsed declaration");
    Ok(iface)
}

/// VLANs fold `link` into the member list and `id` into the parameters.
/// The layer-3 block is kept only when it asks for addressing.
pub fn parse_vlan(key: &str, raw: &Value) -> Result<Interface, Errs> {
    let mut errs = Errs::new(format!("vlan:{key}"));
    let rules = Rules::new()
        .field(
            "link",
            c(string())
                .required()
                .rename("interfaces")
                .transform(|link| Value::List(vec![link])),
        )
        .field("id", c(int_in(0, 4094)).required().rename("parameters.id"))
        .field("macaddress", c(mac()))
        .field("optional", d(false, boolean()))
        .extend(network_rules());

    let Some(mut checked) = rules.validate(&mut errs, raw) else {
        return Err(errs);
    };
    let params = checked.take_map("parameters");
    let fields: Option<LinkFields> = checked.decode(&mut errs);
    let network: Option<Network> = checked.decode(&mut errs);
    let (Some(fields), Some(network)) = (fields, network) else {
        return Err(errs);
    };

    let mut iface = Interface::new(InterfaceKind::Vlan, key, key);
    iface.desired_hw_addr = fields.mac_address;
    iface.members = fields.interfaces;
    iface.optional = fields.optional;
    iface.parameters = params;
    iface.network = network.configure().then_some(network);
    debug!(%key, "parsed vlan declaration");
    Ok(iface)
}

fn match_rules() -> Rules {
    Rules::new()
        .field("name", c(string()))
        .field("macaddress", c(mac()))
        .field("driver", c(string()))
}

/// Layer-3 keys accepted by every declaration kind.
pub fn network_rules() -> Rules {
    Rules::new()
        .field("dhcp4", d(false, boolean()))
        .field("dhcp6", d(false, boolean()))
        .field("accept-ra", d(true, boolean()))
        .field("dhcp-identifier", c(string()))
        .field("dhcp4-overrides", c(nested(override_rules())))
        .field("dhcp6-overrides", c(nested(override_rules())))
        .field("addresses", c(ip_list(true)))
        .field("gateway4", c(ipv4()))
        .field("gateway6", c(ipv6()))
        .field("nameservers", c(nested(nameserver_rules())))
        .field("routes", c(list_of(route_rules())))
        .field("routing-policy", c(list_of(route_policy_rules())))
}

fn override_rules() -> Rules {
    Rules::new()
        .field("use-dns", d(true, boolean()))
        .field("use-ntp", d(true, boolean()))
        .field("send-hostname", d(true, boolean()))
        .field("use-mtu", d(true, boolean()))
        .field("use-routes", d(true, boolean()))
        .field("hostname", c(string()))
        .field("route-metric", c(int_in(0, U32_MAX)))
        .field("use-domains", d("true", use_domains()))
}

/// `use-domains` is a tri-state; plain booleans are accepted for the first
/// two states.
fn use_domains() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    let named = str_in(&["true", "false", "route"]);
    move |errs: &mut Errs, key: &str, value: &Value| match value {
        Value::Bool(b) => Some(Value::Str(b.to_string())),
        other => named(errs, key, other),
    }
}

fn nameserver_rules() -> Rules {
    Rules::new()
        .field("search", c(str_list()))
        .field("addresses", c(ip_list(false)))
}

fn route_rules() -> Rules {
    Rules::new()
        .field("from", c(ip()))
        .field("to", c(ip()))
        .field("via", c(ip()))
        .field("on-link", c(boolean()))
        .field("metric", c(int_in(0, U32_MAX)))
        .field("table", c(int_in(0, U32_MAX)))
        .field("scope", c(str_in(&["global", "link", "host"])))
        .field(
            "type",
            d(
                "unicast",
                str_in(&["unicast", "unreachable", "blackhole", "prohibit"]),
            ),
        )
}

fn route_policy_rules() -> Rules {
    Rules::new()
        .field("from", c(ip()))
        .field("to", c(ip()))
        .field("table", c(int_in(0, U32_MAX)))
        .field("priority", c(int_in(0, U32_MAX)))
        .field("mark", c(int_in(0, U32_MAX)))
        .field("type-of-service", c(int_in(0, 255)))
}

fn bond_parameters() -> Rules {
    Rules::new()
        .field(
            "mode",
            c(str_in(&[
                "balance-rr",
                "active-backup",
                "balance-xor",
                "broadcast",
                "802.3ad",
                "balance-tlb",
                "balance-alb",
            ])),
        )
        .field("lacp-rate", c(str_in(&["fast", "slow"])))
        .field("mii-monitor-interval", c(int_in(0, 127)))
        .field("min-links", c(int_in(1, 127)))
        .field(
            "transmit-hash-policy",
            c(str_in(&[
                "layer2",
                "layer3+4",
                "layer2+3",
                "encap2+3",
                "encap3+4",
            ])),
        )
        .field("ad-select", c(str_in(&["stable", "bandwidth", "count"])))
        .field("all-slaves-active", c(boolean()))
        .field("arp-interval", c(int_in(0, 127)))
        .field("arp-ip-targets", c(ip_list(false)))
        .field("arp-validate", c(str_in(&["none", "active", "backup", "all"])))
        .field("arp-all-targets", c(str_in(&["any", "all"])))
        .field("up-delay", c(int_in(0, 127)))
        .field("down-delay", c(int_in(0, 127)))
        .field(
            "fail-over-mac-policy",
            c(str_in(&["none", "active", "follow"])),
        )
        .field("gratuitous-arp", c(int_in(1, 127)))
        .field("packets-per-slave", c(int_in(0, 65535)))
        .field(
            "primary-reselect-policy",
            c(str_in(&["always", "better", "failure"])),
        )
        .field("resend-igmp", c(int_in(0, 255)))
        .field("learn-packet-interval", c(int_in(1, 0x7fff_ffff)))
        .field("primary", c(string()))
}

fn bridge_parameters() -> Rules {
    Rules::new()
        .field("stp", d(true, boolean()))
        .field("priority", d(32768_i64, int_in(0, 65535)))
        .field("ageing-time", c(int_in(0, 127)))
        .field("forward-delay", c(int_in(0, 127)))
        .field("hello-time", c(int_in(0, 127)))
        .field("max-age", c(int_in(0, 127)))
}
