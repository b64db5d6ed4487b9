//! Hardware and IP address types.
//!
//! Both serialize as their canonical text form so they can travel through
//! YAML snapshots, checked rule output, and rendered files unchanged.

use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors returned when parsing address text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrParseError {
    #[error("invalid hardware address '{0}'")]
    Mac(String),
    #[error("invalid IP address '{0}'")]
    Ip(String),
}

/// A link-layer hardware address (EUI-48, EUI-64 or 20-byte InfiniBand).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HardwareAddr(Vec<u8>);

impl HardwareAddr {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for HardwareAddr {
    type Err = AddrParseError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` and `aabb.ccdd.eeff`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || AddrParseError::Mac(raw.to_string());
        let s = raw.trim();

        let mut bytes = Vec::new();
        if s.contains('.') {
            for group in s.split('.') {
                if group.len() != 4 || !group.is_ascii() {
                    return Err(err());
                }
                bytes.push(u8::from_str_radix(&group[..2], 16).map_err(|_| err())?);
                bytes.push(u8::from_str_radix(&group[2..], 16).map_err(|_| err())?);
            }
        } else {
            let sep = if s.contains('-') { '-' } else { ':' };
            for group in s.split(sep) {
                if group.len() != 2 {
                    return Err(err());
                }
                bytes.push(u8::from_str_radix(group, 16).map_err(|_| err())?);
            }
        }

        match bytes.len() {
            6 | 8 | 20 => Ok(Self(bytes)),
            _ => Err(err()),
        }
    }
}

impl Display for HardwareAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for HardwareAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HardwareAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// An IP address with an optional prefix length.
///
/// `10.0.0.5/24` keeps its host bits; "CIDR form" just means the prefix is
/// present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpNet {
    pub addr: IpAddr,
    pub prefix: Option<u8>,
}

impl IpNet {
    pub fn is_cidr(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }
}

impl FromStr for IpNet {
    type Err = AddrParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || AddrParseError::Ip(raw.to_string());
        let s = raw.trim();
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| err())?;
        let prefix = match prefix {
            Some(p) => {
                let p: u8 = p.parse().map_err(|_| err())?;
                let max = if addr.is_ipv4() { 32 } else { 128 };
                if p > max {
                    return Err(err());
                }
                Some(p)
            }
            None => None,
        };
        Ok(Self { addr, prefix })
    }
}

impl Display for IpNet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(p) => write!(f, "{}/{}", self.addr, p),
            None => write!(f, "{}", self.addr),
        }
    }
}

impl Serialize for IpNet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpNet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{HardwareAddr, IpNet};

    #[test]
    fn parses_mac_spellings() {
        let colon: HardwareAddr = "52:54:01:23:00:0A".parse().expect("colon");
        let dash: HardwareAddr = "52-54-01-23-00-0a".parse().expect("dash");
        let dot: HardwareAddr = "5254.0123.000a".parse().expect("dot");
        assert_eq!(colon, dash);
        assert_eq!(colon, dot);
        assert_eq!(colon.to_string(), "52:54:01:23:00:0a");
    }

    #[test]
    fn rejects_bad_macs() {
        for raw in ["", "52:54:01", "52:54:01:23:00:zz", "5254.0123", "52:54-01:23:00:0a"] {
            assert!(raw.parse::<HardwareAddr>().is_err(), "{raw}");
        }
    }

    #[test]
    fn ipnet_tracks_cidr_form() {
        let cidr: IpNet = "192.168.1.10/24".parse().expect("cidr");
        assert!(cidr.is_cidr());
        assert_eq!(cidr.to_string(), "192.168.1.10/24");

        let bare: IpNet = "2001:db8::1".parse().expect("bare");
        assert!(!bare.is_cidr());
        assert!(!bare.is_ipv4());

        assert!("10.0.0.1/33".parse::<IpNet>().is_err());
        assert!("not-an-ip".parse::<IpNet>().is_err());
    }
}
