//! Layer-3 configuration carried by interface nodes.
//!
//! Field names follow the netplan spelling so checked declaration tables
//! decode directly into these types.

use field_rules::Errs;
use serde::{Deserialize, Serialize};

use crate::addr::IpNet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    #[default]
    Unicast,
    Unreachable,
    Blackhole,
    Prohibit,
}

impl RouteType {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteType::Unicast => "unicast",
            RouteType::Unreachable => "unreachable",
            RouteType::Blackhole => "blackhole",
            RouteType::Prohibit => "prohibit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteScope {
    Global,
    Link,
    Host,
}

impl RouteScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteScope::Global => "global",
            RouteScope::Link => "link",
            RouteScope::Host => "host",
        }
    }
}

/// A static route installed when the interface comes up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<IpNet>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub on_link: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: RouteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<RouteScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
}

impl Route {
    fn validate(&self) -> Errs {
        let mut errs = Errs::new("route");
        if let Some(via) = self.via.filter(IpNet::is_cidr) {
            errs.push(format!("via must be a single IP address, not {via}"));
        }
        match self.kind {
            RouteType::Unicast => {
                if self.to.is_none() || self.via.is_none() {
                    errs.push("unicast routes require 'to' and 'via'");
                }
            }
            other => {
                if self.to.is_none() {
                    errs.push(format!("{} routes require 'to'", other.as_str()));
                }
            }
        }
        errs
    }
}

/// A policy-routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RoutePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_service: Option<u8>,
}

impl RoutePolicy {
    fn validate(&self) -> Errs {
        let mut errs = Errs::new("routing-policy");
        if self.from.is_some() == self.to.is_some() {
            errs.push("Route policy must include either a from or a to");
        }
        errs
    }
}

/// DNS servers and search domains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nameservers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpNet>,
}

/// Which DHCP-provided settings to honor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DhcpOverrides {
    pub use_dns: bool,
    pub use_ntp: bool,
    pub send_hostname: bool,
    pub use_mtu: bool,
    pub use_routes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_metric: Option<u32>,
    pub use_domains: String,
}

/// Layer-3 settings for one interface. An interface without one is left
/// unaddressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Network {
    #[serde(default)]
    pub accept_ra: bool,
    #[serde(default)]
    pub dhcp4: bool,
    #[serde(default)]
    pub dhcp6: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp4_overrides: Option<DhcpOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp6_overrides: Option<DhcpOverrides>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway4: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway6: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Nameservers>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_policy: Vec<RoutePolicy>,
}

impl Network {
    /// Whether any addressing mechanism is requested.
    pub fn configure(&self) -> bool {
        self.accept_ra || self.dhcp4 || self.dhcp6 || !self.addresses.is_empty()
    }

    /// Static addresses only, no DHCP.
    pub fn static_only(&self) -> bool {
        !(self.dhcp4 || self.dhcp6) && !self.addresses.is_empty()
    }

    /// DHCP only, no static addresses.
    pub fn dhcp_only(&self) -> bool {
        (self.dhcp4 || self.dhcp6) && self.addresses.is_empty()
    }

    /// Whether this block is exactly what an empty declaration parses to.
    /// Such a block asks for nothing the OS would not do anyway.
    pub fn is_default(&self) -> bool {
        *self
            == Network {
                accept_ra: true,
                ..Network::default()
            }
    }

    /// Check cross-field rules that single-field checkers cannot see.
    pub fn validate(&self) -> Errs {
        let mut errs = Errs::new("network");
        if let Some(id) = self.dhcp_identifier.as_deref().filter(|id| *id != "mac") {
            errs.push(format!("dhcp-identifier: {id}: Not in valid set: [mac]"));
        }
        for addr in self.addresses.iter().filter(|a| !a.is_cidr()) {
            errs.push(format!("addresses: {addr} is not in the expected format"));
        }
        if let Some(gw) = self.gateway4.filter(|gw| !gw.is_ipv4()) {
            errs.push(format!("Gateway4 {gw} is not an IPv4 address"));
        }
        if let Some(gw) = self.gateway6.filter(IpNet::is_ipv4) {
            errs.push(format!("Gateway6 {gw} is not an IPv6 address"));
        }
        if let Some(ns) = &self.nameservers {
            for addr in ns.addresses.iter().filter(|a| a.is_cidr()) {
                errs.push(format!(
                    "nameservers: addresses: {addr} is not in the expected format"
                ));
            }
        }
        for route in &self.routes {
            errs.merge(route.validate());
        }
        for policy in &self.routing_policy {
            errs.merge(policy.validate());
        }
        errs
    }
}

#[cfg(test)]
mod tests {
    use super::{Network, Route, RoutePolicy, RouteType};

    fn ip(s: &str) -> crate::addr::IpNet {
        s.parse().expect("ip")
    }

    #[test]
    fn predicates_follow_addressing_mode() {
        let mut n = Network::default();
        assert!(!n.configure());
        n.addresses.push(ip("10.0.0.2/24"));
        assert!(n.configure());
        assert!(n.static_only());
        n.dhcp4 = true;
        assert!(!n.static_only());
        assert!(!n.dhcp_only());
        n.addresses.clear();
        assert!(n.dhcp_only());
    }

    #[test]
    fn declared_defaults_count_as_empty() {
        let mut n = Network {
            accept_ra: true,
            ..Network::default()
        };
        assert!(n.is_default());
        // an explicit accept-ra: false is a real setting
        assert!(!Network::default().is_default());
        n.dhcp6 = true;
        assert!(!n.is_default());
    }

    #[test]
    fn routes_need_destination_and_gateway() {
        let n = Network {
            routes: vec![
                Route {
                    to: Some(ip("10.1.0.0/16")),
                    ..Route::default()
                },
                Route {
                    to: Some(ip("10.2.0.0/16")),
                    kind: RouteType::Blackhole,
                    ..Route::default()
                },
                Route {
                    to: Some(ip("10.3.0.0/16")),
                    via: Some(ip("10.0.0.1/24")),
                    ..Route::default()
                },
            ],
            ..Network::default()
        };
        let errs = n.validate();
        assert_eq!(
            errs.messages(),
            &[
                "route: unicast routes require 'to' and 'via'".to_string(),
                "route: via must be a single IP address, not 10.0.0.1/24".to_string(),
            ]
        );
    }

    #[test]
    fn routing_policy_needs_exactly_one_selector() {
        let n = Network {
            routing_policy: vec![
                RoutePolicy::default(),
                RoutePolicy {
                    from: Some(ip("10.0.0.0/8")),
                    ..RoutePolicy::default()
                },
            ],
            ..Network::default()
        };
        assert_eq!(n.validate().len(), 1);
    }

    #[test]
    fn gateway_family_is_checked() {
        let n = Network {
            gateway4: Some(ip("2001:db8::1")),
            gateway6: Some(ip("10.0.0.1")),
            dhcp_identifier: Some("duid".to_string()),
            ..Network::default()
        };
        assert_eq!(n.validate().len(), 3);
    }
}
