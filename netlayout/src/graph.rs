//! The interface graph and its structural validation.

use std::collections::{BTreeMap, BTreeSet};

use field_rules::Errs;
use serde::Serialize;
use tracing::debug;

use crate::model::{Interface, InterfaceKind};

/// A set of interface nodes plus the parent and root relations derived from
/// their member lists.
///
/// `child_to_parents` and `roots` are only ever computed by
/// [`Graph::validate`]; callers never fill them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Graph {
    pub interfaces: BTreeMap<String, Interface>,
    pub child_to_parents: BTreeMap<String, Vec<String>>,
    pub roots: Vec<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Add a node. A node with the same name is left in place and the new one
    /// is handed back.
    pub fn insert(&mut self, iface: Interface) -> Result<(), Interface> {
        if self.interfaces.contains_key(&iface.name) {
            return Err(iface);
        }
        self.interfaces.insert(iface.name.clone(), iface);
        Ok(())
    }

    pub fn parents(&self, name: &str) -> &[String] {
        self.child_to_parents
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Enforce the ownership and nesting rules, then derive the parent
    /// relation, the roots, and check for cycles.
    ///
    /// Every node is checked even after a failure. `child_to_parents` and
    /// `roots` are recomputed from scratch on each call and are populated
    /// even when errors are returned. Cycle detection and the clearing of
    /// member layer-3 blocks only run when the per-node checks passed.
    pub fn validate(&mut self) -> Result<(), Errs> {
        let mut errs = Errs::new("graph");
        self.child_to_parents.clear();
        self.roots.clear();

        let names: Vec<String> = self.interfaces.keys().cloned().collect();
        for name in &names {
            errs.merge(self.validate_node(name));
        }

        self.roots = names
            .iter()
            .filter(|name| !self.child_to_parents.contains_key(*name))
            .cloned()
            .collect();

        if !errs.is_empty() {
            return Err(errs);
        }

        let owned: Vec<String> = self
            .interfaces
            .values()
            .filter(|iface| iface.kind.owns_members())
            .flat_map(|iface| iface.members.iter().cloned())
            .collect();
        for member in owned {
            if let Some(child) = self.interfaces.get_mut(&member) {
                child.network = None;
            }
        }

        let mut clean = BTreeSet::new();
        let mut stack = Vec::new();
        for name in &names {
            self.walk_parents(name, &mut stack, &mut clean, &mut errs);
        }
        debug!(nodes = names.len(), roots = self.roots.len(), "graph validated");
        errs.into_result()
    }

    fn validate_node(&mut self, name: &str) -> Errs {
        let Some(iface) = self.interfaces.get_mut(name) else {
            return Errs::default();
        };
        let mut errs = Errs::new(iface.label());

        if iface.kind == InterfaceKind::Physical {
            if !iface.members.is_empty() {
                errs.push(format!(
                    "{}:{} must not refer to sub interfaces {:?}",
                    iface.kind, iface.name, iface.members
                ));
            }
            return errs;
        }

        if let Some(network) = &iface.network {
            errs.merge(network.validate());
        }
        iface.members.sort();
        iface.members.dedup();

        let kind = iface.kind;
        let members = iface.members.clone();
        if kind == InterfaceKind::Vlan && members.len() != 1 {
            errs.push(format!(
                "{kind}:{name} must be built on exactly one interface, found {}",
                members.len()
            ));
        }
        let mut strip = Vec::new();
        for member in &members {
            let Some(child) = self.interfaces.get(member) else {
                errs.push(format!(
                    "{kind}:{name} refers to undefined sub interface {member}"
                ));
                continue;
            };
            let nested = match kind {
                InterfaceKind::Bond if child.kind != InterfaceKind::Physical => {
                    errs.push(format!(
                        "{kind}:{name} refers to {}:{}, which is not a physical interface",
                        child.kind, child.name
                    ));
                    continue;
                }
                InterfaceKind::Bridge if child.kind == InterfaceKind::Bridge => {
                    Some("bridge on bridge")
                }
                InterfaceKind::Vlan if child.kind == InterfaceKind::Vlan => Some("VLAN on VLAN"),
                _ => None,
            };
            if let Some(what) = nested {
                errs.push(format!(
                    "{kind}:{name} cannot be built on {}:{} (cannot nest {what})",
                    child.kind, child.name
                ));
                continue;
            }
            if kind.owns_members() {
                strip.push(member.clone());
            }

            let parents = self.child_to_parents.entry(member.clone()).or_default();
            let mut claimed = false;
            for other in parents.iter() {
                let other_kind = self
                    .interfaces
                    .get(other)
                    .map(|iface| iface.kind)
                    .unwrap_or(InterfaceKind::Physical);
                if kind != InterfaceKind::Vlan || other_kind != InterfaceKind::Vlan {
                    errs.push(format!(
                        "{}:{} is already owned by {other_kind}:{other}, it cannot be a member of {kind}:{name}",
                        child.kind, child.name
                    ));
                    claimed = true;
                }
            }
            if !claimed {
                parents.push(name.to_string());
                parents.sort();
            }
        }

        for member in strip {
            if let Some(child) = self.interfaces.get_mut(&member) {
                child.network = None;
            }
        }
        errs
    }

    fn walk_parents(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        clean: &mut BTreeSet<String>,
        errs: &mut Errs,
    ) {
        if clean.contains(name) {
            return;
        }
        if let Some(pos) = stack.iter().position(|seen| seen == name) {
            let mut path = stack[pos..].to_vec();
            path.push(name.to_string());
            errs.push(format!("{name}: cycle detected: {}", path.join(" -> ")));
            return;
        }
        stack.push(name.to_string());
        for parent in self.parents(name) {
            self.walk_parents(parent, stack, clean, errs);
        }
        stack.pop();
        clean.insert(name.to_string());
    }
}
