//! Address checkers for rule tables.
//!
//! Each returns the canonical text form of the address so checked output can
//! be decoded straight into [`HardwareAddr`] / [`IpNet`] fields.

use field_rules::{Errs, Value};

use crate::addr::{HardwareAddr, IpNet};

pub fn mac() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, value: &Value| {
        let parsed = value.as_str().map(str::parse::<HardwareAddr>);
        match parsed {
            Some(Ok(addr)) => Some(Value::Str(addr.to_string())),
            Some(Err(err)) => {
                errs.push(format!("{key}: Cannot cast {value} to a HardwareAddr: {err}"));
                None
            }
            None => {
                errs.push(format!("{key}: Cannot cast {value} to a HardwareAddr"));
                None
            }
        }
    }
}

pub fn ip() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, value: &Value| {
        parse_ip(errs, key, value).map(|ip| Value::Str(ip.to_string()))
    }
}

pub fn ipv4() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, value: &Value| {
        let ip = parse_ip(errs, key, value)?;
        if !ip.is_ipv4() {
            errs.push(format!("{key}: {ip} is not an IPv4 address"));
            return None;
        }
        Some(Value::Str(ip.to_string()))
    }
}

pub fn ipv6() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, value: &Value| {
        let ip = parse_ip(errs, key, value)?;
        if ip.is_ipv4() {
            errs.push(format!("{key}: {ip} is not an IPv6 address"));
            return None;
        }
        Some(Value::Str(ip.to_string()))
    }
}

/// A list of addresses that must all be in CIDR form (`cidr`) or all bare.
pub fn ip_list(cidr: bool) -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    move |errs: &mut Errs, key: &str, value: &Value| {
        let Some(items) = value.as_list() else {
            errs.push(format!("{key}: Cannot cast {value} to a list of IPs"));
            return None;
        };
        let mut ok = true;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let Some(ip) = parse_ip(errs, key, item) else {
                ok = false;
                continue;
            };
            if ip.is_cidr() != cidr {
                errs.push(format!("{key}: {ip} is not in the expected format"));
                ok = false;
                continue;
            }
            out.push(Value::Str(ip.to_string()));
        }
        ok.then_some(Value::List(out))
    }
}

fn parse_ip(errs: &mut Errs, key: &str, value: &Value) -> Option<IpNet> {
    let Some(raw) = value.as_str() else {
        errs.push(format!("{key}: Cannot cast {value} to an IP"));
        return None;
    };
    match raw.parse::<IpNet>() {
        Ok(ip) => Some(ip),
        Err(err) => {
            errs.push(format!("{key}: Cannot cast {value} to an IP: {err}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use field_rules::{Errs, Value};

    use super::{ip_list, ipv4, ipv6, mac};

    fn run(
        checker: impl Fn(&mut Errs, &str, &Value) -> Option<Value>,
        raw: &str,
    ) -> (Option<Value>, Errs) {
        let mut errs = Errs::new("t");
        let value = Value::from_yaml_str(raw).expect("yaml");
        let res = checker(&mut errs, "k", &value);
        (res, errs)
    }

    #[test]
    fn mac_normalizes_spelling() {
        assert_eq!(
            run(mac(), "'52-54-01-23-00-0A'").0,
            Some(Value::from("52:54:01:23:00:0a"))
        );
        assert!(run(mac(), "12").0.is_none());
    }

    #[test]
    fn gateways_check_family() {
        assert!(run(ipv4(), "10.0.0.1").0.is_some());
        assert!(run(ipv4(), "'2001:db8::1'").0.is_none());
        assert!(run(ipv6(), "'2001:db8::1'").0.is_some());
        assert!(run(ipv6(), "10.0.0.1").0.is_none());
    }

    #[test]
    fn ip_list_enforces_cidr_form() {
        assert!(run(ip_list(true), "[10.0.0.2/24, '2001:db8::2/64']").0.is_some());
        let (res, errs) = run(ip_list(true), "[10.0.0.2/24, 10.0.0.3]");
        assert!(res.is_none());
        assert!(errs.messages()[0].contains("not in the expected format"));
        assert!(run(ip_list(false), "[8.8.8.8, 1.1.1.1]").0.is_some());
        assert!(run(ip_list(false), "8.8.8.8").0.is_none());
    }
}
