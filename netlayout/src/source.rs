//! Reading the declaration document.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use field_rules::checkers::{c, int_in, string, table};
use field_rules::{Errs, Rules, Value, ValueError};
use thiserror::Error;

/// The only declaration format version understood.
pub const SUPPORTED_VERSION: i64 = 2;

/// The top-level `network:` object, split by interface kind. Entries are
/// kept raw; each is checked by its kind's parser during compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    pub version: i64,
    pub renderer: Option<String>,
    pub ethernets: BTreeMap<String, Value>,
    pub bonds: BTreeMap<String, Value>,
    pub bridges: BTreeMap<String, Value>,
    pub vlans: BTreeMap<String, Value>,
    /// Wireless declarations are present. They are never compiled.
    pub wifis: bool,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read declarations from stdin: {0}")]
    Stdin(#[source] io::Error),
    #[error("failed to decode declarations: {0}")]
    Decode(#[from] ValueError),
    #[error(transparent)]
    Invalid(#[from] Errs),
}

impl Declarations {
    /// Split a decoded document into per-kind tables. Unknown keys at either
    /// level are rejected.
    pub fn from_value(doc: &Value) -> Result<Declarations, Errs> {
        let mut errs = Errs::new("declarations");
        let top = Rules::new().field("network", c(table()).required());
        let top_ok = top.validate(&mut errs, doc).is_some();
        let network = doc
            .get_path(&["network"])
            .cloned()
            .unwrap_or(Value::Null);

        let rules = Rules::new()
            .field("version", c(int_in(i64::MIN, i64::MAX)).required())
            .field("renderer", c(string()))
            .field("ethernets", c(table()))
            .field("bonds", c(table()))
            .field("bridges", c(table()))
            .field("vlans", c(table()))
            .field("wifis", c(table()));
        let mut sub = Errs::new("network");
        let checked = rules.validate(&mut sub, &network);
        errs.merge(sub);
        let (true, Some(mut checked)) = (top_ok, checked) else {
            return Err(errs);
        };

        Ok(Declarations {
            version: checked.int("version").unwrap_or_default(),
            renderer: checked.str("renderer").map(ToOwned::to_owned),
            ethernets: checked.take_map("ethernets"),
            bonds: checked.take_map("bonds"),
            bridges: checked.take_map("bridges"),
            vlans: checked.take_map("vlans"),
            wifis: checked.contains("wifis"),
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Declarations, SourceError> {
        let doc = Value::from_yaml_str(raw)?;
        Ok(Declarations::from_value(&doc)?)
    }

    /// Read declarations from `path`, or from stdin when it is `-`.
    pub fn read(path: &Path) -> Result<Declarations, SourceError> {
        let raw = if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(SourceError::Stdin)?;
            buf
        } else {
            fs::read_to_string(path).map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?
        };
        Declarations::from_yaml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{Declarations, SourceError};

    #[test]
    fn splits_by_kind() {
        let decls = Declarations::from_yaml_str(
            "network:\n  version: 2\n  renderer: networkd\n  ethernets:\n    eth0: {dhcp4: true}\n  \
             bridges:\n    br0: {interfaces: [eth0]}\n",
        )
        .expect("valid");
        assert_eq!(decls.version, 2);
        assert_eq!(decls.renderer.as_deref(), Some("networkd"));
        assert!(decls.ethernets.contains_key("eth0"));
        assert!(decls.bridges.contains_key("br0"));
        assert!(decls.bonds.is_empty());
        assert!(!decls.wifis);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Declarations::from_yaml_str("network:\n  version: 2\n  tunnels: {}\nextra: 1\n")
            .expect_err("unknown keys");
        let SourceError::Invalid(errs) = err else {
            panic!("unexpected error {err}");
        };
        assert_eq!(
            errs.messages(),
            &[
                "Key extra is not supported".to_string(),
                "network: Key tunnels is not supported".to_string(),
            ]
        );
    }

    #[test]
    fn notes_wifis_and_requires_version() {
        let decls =
            Declarations::from_yaml_str("network:\n  version: 2\n  wifis: {wlan0: {}}\n")
                .expect("valid");
        assert!(decls.wifis);

        let err = Declarations::from_yaml_str("network: {}\n").expect_err("no version");
        assert!(err.to_string().contains("network: version is required"));
    }

    #[test]
    fn malformed_yaml_is_a_decode_error() {
        let err = Declarations::from_yaml_str("network: [").expect_err("bad yaml");
        assert!(matches!(err, SourceError::Decode(_)));
    }
}
