//! `check` output: the interface tree and the diagnostics.

use colored::Colorize;
use field_rules::Errs;
use serde::Serialize;

use crate::graph::Graph;
use crate::model::InterfaceKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub interfaces: usize,
    pub roots: Vec<TreeNode>,
    pub errors: Vec<String>,
}

/// One interface and the members it is built on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// `None` when the name does not resolve to a node.
    pub kind: Option<InterfaceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TreeNode>,
}

pub fn build_check_report(graph: &Graph, errs: Option<&Errs>) -> CheckReport {
    let mut path = Vec::new();
    CheckReport {
        interfaces: graph.interfaces.len(),
        roots: graph
            .roots
            .iter()
            .map(|root| tree_node(graph, root, &mut path))
            .collect(),
        errors: errs.map(|e| e.messages().to_vec()).unwrap_or_default(),
    }
}

fn tree_node(graph: &Graph, name: &str, path: &mut Vec<String>) -> TreeNode {
    let iface = graph.get(name);
    let mut node = TreeNode {
        name: name.to_string(),
        kind: iface.map(|i| i.kind),
        match_id: iface
            .filter(|i| i.match_id != i.name)
            .map(|i| i.match_id.clone()),
        cycle: path.iter().any(|seen| seen == name),
        members: Vec::new(),
    };
    let Some(iface) = iface.filter(|_| !node.cycle) else {
        return node;
    };
    path.push(name.to_string());
    node.members = iface
        .members
        .iter()
        .map(|member| tree_node(graph, member, path))
        .collect();
    path.pop();
    node
}

pub fn render_check_text(report: &CheckReport) -> String {
    let mut out = String::new();
    for root in &report.roots {
        render_node(root, 0, &mut out);
    }
    for err in &report.errors {
        out.push_str(&format!("{} {err}\n", "error".red().bold()));
    }
    out.push_str(&format!(
        "result interfaces={} roots={} errors={}",
        report.interfaces,
        report.roots.len(),
        report.errors.len()
    ));
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let kind = match node.kind {
        Some(InterfaceKind::Physical) => "physical".normal(),
        Some(InterfaceKind::Bond) => "bond".cyan(),
        Some(InterfaceKind::Bridge) => "bridge".green(),
        Some(InterfaceKind::Vlan) => "vlan".yellow(),
        None => "undefined".red(),
    };
    let mut line = format!("{indent}{} [{kind}]", node.name.bold());
    if let Some(match_id) = &node.match_id {
        line.push_str(&format!(" from {match_id}"));
    }
    if node.cycle {
        line.push_str(&format!(" {}", "(cycle)".red()));
    }
    out.push_str(&line);
    out.push('\n');
    for member in &node.members {
        render_node(member, depth + 1, out);
    }
}
