//! Turning declarations into a validated interface graph.

use std::collections::{BTreeMap, BTreeSet};

use field_rules::{Errs, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decl::{parse_bond, parse_bridge, parse_ethernet, parse_vlan};
use crate::discovery::PhysicalNic;
use crate::graph::Graph;
use crate::model::{Interface, InterfaceKind};
use crate::phys::{match_phys, MatchSpec};
use crate::policy::{CompilePolicy, UnmatchedPolicy};
use crate::source::{Declarations, SUPPORTED_VERSION};

/// Compilation failed. `graph` holds whatever could be built, for
/// diagnostics only.
#[derive(Debug, Error)]
#[error("{errs}")]
pub struct CompileError {
    pub graph: Graph,
    pub errs: Errs,
}

/// Which ethernet declaration claimed each NIC during one compile run.
#[derive(Debug, Default)]
struct PhysClaims {
    owner: BTreeMap<String, String>,
}

impl PhysClaims {
    /// Claim `nic` for `decl`. Returns the earlier owner if there is one.
    fn claim(&mut self, nic: &str, decl: &str) -> Option<&str> {
        if self.owner.contains_key(nic) {
            return self.owner.get(nic).map(String::as_str);
        }
        self.owner.insert(nic.to_string(), decl.to_string());
        None
    }
}

/// Per-run compiler state.
struct Compiler<'a> {
    decls: &'a Declarations,
    phys: &'a [PhysicalNic],
    policy: &'a CompilePolicy,
    graph: Graph,
    errs: Errs,
    claims: PhysClaims,
    /// Ethernet key to the NIC names it resolved to.
    match_children: BTreeMap<String, Vec<String>>,
    /// Optional ethernet keys skipped because they matched nothing.
    skipped: BTreeSet<String>,
}

/// Compile `decls` against the discovered NICs.
///
/// Declarations are processed kind by kind (ethernets, bonds, bridges,
/// VLANs) and in key order within each kind. A bad declaration is dropped
/// and its problems recorded; the rest still compile. All problems,
/// including graph validation failures, are returned together.
pub fn compile(
    decls: &Declarations,
    phys: &[PhysicalNic],
    policy: &CompilePolicy,
) -> Result<Graph, CompileError> {
    let mut compiler = Compiler {
        decls,
        phys,
        policy,
        graph: Graph::new(),
        errs: Errs::new("compile"),
        claims: PhysClaims::default(),
        match_children: BTreeMap::new(),
        skipped: BTreeSet::new(),
    };

    if decls.version != SUPPORTED_VERSION {
        compiler.errs.push(format!(
            "version: {} out of range {SUPPORTED_VERSION}:{SUPPORTED_VERSION}",
            decls.version
        ));
    }
    if decls.wifis {
        compiler.errs.push("Wifi interfaces not supported");
    }
    if !compiler.errs.is_empty() {
        return Err(CompileError {
            graph: compiler.graph,
            errs: compiler.errs,
        });
    }

    for (key, raw) in &decls.ethernets {
        compiler.add_ethernet(key, raw);
    }
    for (key, raw) in &decls.bonds {
        compiler.add_link(key, parse_bond(key, raw));
    }
    for (key, raw) in &decls.bridges {
        compiler.add_link(key, parse_bridge(key, raw));
    }
    for (key, raw) in &decls.vlans {
        compiler.add_link(key, parse_vlan(key, raw));
    }

    let Compiler {
        mut graph,
        mut errs,
        ..
    } = compiler;
    if let Err(graph_errs) = graph.validate() {
        errs.merge(graph_errs);
    }
    if !errs.is_empty() {
        return Err(CompileError { graph, errs });
    }
    info!(
        interfaces = graph.interfaces.len(),
        roots = graph.roots.len(),
        "compiled interface graph"
    );
    Ok(graph)
}

impl Compiler<'_> {
    fn add_ethernet(&mut self, key: &str, raw: &Value) {
        let decl = match parse_ethernet(key, raw) {
            Ok(decl) => decl,
            Err(errs) => {
                self.errs.merge(errs);
                return;
            }
        };
        let spec = if decl.match_spec.is_empty() {
            MatchSpec::by_name(key)
        } else {
            decl.match_spec
        };
        let found = match match_phys(&spec, &decl.template, self.phys, &self.policy.boot_token) {
            Ok(found) => found,
            Err(err) => {
                self.errs
                    .push(format!("ethernet:{key}: Invalid interface match: {err}"));
                return;
            }
        };

        if found.is_empty() {
            if self.policy.unmatched_ethernet == UnmatchedPolicy::AllowOptional
                && decl.template.optional
            {
                warn!(%key, "optional ethernet matched no interfaces, skipping");
                self.skipped.insert(key.to_string());
            } else {
                self.errs.push(format!(
                    "ethernet:{key}: Ethernet interface {key} does not resolve to any interfaces"
                ));
            }
            return;
        }

        let mut children = Vec::with_capacity(found.len());
        for iface in found {
            children.push(iface.name.clone());
            if let Some(owner) = self.claims.claim(&iface.name, key) {
                warn!(nic = %iface.name, %owner, %key, "interface already claimed by an earlier declaration");
                continue;
            }
            self.insert(iface);
        }
        children.sort();
        self.match_children.insert(key.to_string(), children);
    }

    fn add_link(&mut self, key: &str, parsed: Result<Interface, Errs>) {
        let mut iface = match parsed {
            Ok(iface) => iface,
            Err(errs) => {
                self.errs.merge(errs);
                return;
            }
        };
        let mut members = Vec::with_capacity(iface.members.len());
        for member in std::mem::take(&mut iface.members) {
            self.resolve_member(key, member, &mut members);
        }
        members.sort();
        members.dedup();
        iface.members = members;
        self.insert(iface);
    }

    /// Rewrite one member reference into concrete node names.
    fn resolve_member(&mut self, key: &str, member: String, out: &mut Vec<String>) {
        if let Some(children) = self.match_children.get(&member) {
            out.extend(children.iter().cloned());
            return;
        }
        if self.skipped.contains(&member) {
            debug!(%key, %member, "dropping member that matched no interfaces");
            return;
        }
        let declared = self.decls.bonds.contains_key(&member)
            || self.decls.bridges.contains_key(&member)
            || self.decls.vlans.contains_key(&member);
        if declared || self.graph.contains(&member) {
            out.push(member);
            return;
        }
        let phys = self.phys;
        let nic = phys.iter().find(|nic| {
            nic.name == member || nic.stable_name == member || nic.ordinal_name == member
        });
        let Some(nic) = nic else {
            // left for graph validation to report
            out.push(member);
            return;
        };
        if !self.graph.contains(&nic.name) {
            debug!(%key, nic = %nic.name, "adding implicit physical member");
            let mut implicit = Interface::new(InterfaceKind::Physical, &nic.name, &nic.name);
            implicit.current_hw_addr = Some(nic.hardware_address.clone());
            self.insert(implicit);
        }
        out.push(nic.name.clone());
    }

    fn insert(&mut self, iface: Interface) {
        if let Err(dup) = self.graph.insert(iface) {
            let other = self
                .graph
                .get(&dup.name)
                .map(|other| other.kind.as_str())
                .unwrap_or("unknown");
            self.errs.push(format!(
                "{}:{name}: Duplicate network definition! {name} also defined in {other}",
                dup.kind,
                name = dup.name
            ));
        }
    }
}
