//! Compile policy: decisions the declaration format leaves open.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Handling of an ethernet declaration that resolves to no NIC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedPolicy {
    /// Always a declaration-level error.
    #[default]
    Error,
    /// Skipped with a warning when the declaration is `optional: true`.
    AllowOptional,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilePolicy {
    #[serde(default)]
    pub unmatched_ethernet: UnmatchedPolicy,
    #[serde(default = "default_boot_token")]
    pub boot_token: String,
}

impl Default for CompilePolicy {
    fn default() -> Self {
        Self {
            unmatched_ethernet: UnmatchedPolicy::default(),
            boot_token: default_boot_token(),
        }
    }
}

fn default_boot_token() -> String {
    "bootif".to_string()
}

/// Errors returned when loading a policy file.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

pub fn load_policy(path: &Path) -> Result<CompilePolicy, PolicyLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_policy(&raw, path.display().to_string())
}

/// The policy shipped with the binary.
pub fn default_policy() -> CompilePolicy {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/policy/default.toml"));
    parse_policy(embedded, "embedded policy".to_string()).unwrap_or_default()
}

fn parse_policy(raw: &str, path: String) -> Result<CompilePolicy, PolicyLoadError> {
    toml::from_str(raw).map_err(|source| PolicyLoadError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{default_policy, load_policy, CompilePolicy, UnmatchedPolicy};

    #[test]
    fn embedded_policy_matches_defaults() {
        assert_eq!(default_policy(), CompilePolicy::default());
    }

    #[test]
    fn loads_override_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("policy.toml");
        fs::write(&path, "unmatched_ethernet = \"allow-optional\"\n").expect("write");
        let policy = load_policy(&path).expect("load");
        assert_eq!(policy.unmatched_ethernet, UnmatchedPolicy::AllowOptional);
        assert_eq!(policy.boot_token, "bootif");
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("policy.toml");
        fs::write(&path, "unmatched_ethernet = \"ignore\"\n").expect("write");
        let err = load_policy(&path).expect_err("bad value");
        assert!(err.to_string().contains("failed to parse policy file"));

        fs::write(&path, "colour = \"red\"\n").expect("write");
        assert!(load_policy(&path).is_err());

        let err = load_policy(&dir.path().join("missing.toml")).expect_err("missing");
        assert!(err.to_string().contains("failed to read policy file"));
    }
}
