//! Compile declarative NIC, bond, bridge and VLAN layouts into a validated
//! interface graph.
//!
//! # Pipeline
//!
//! 1. [`source`] reads the netplan-style declaration document.
//! 2. [`discovery`] lists the host's physical NICs, live or from a snapshot.
//! 3. [`compile`] parses every declaration ([`decl`]), resolves ethernet
//!    match specifications against the NICs ([`phys`]) and assembles the
//!    [`graph::Graph`].
//! 4. [`graph::Graph::validate`] enforces ownership and nesting rules,
//!    derives parents and roots, and detects cycles.
//! 5. A [`render::Renderer`] turns the graph into configuration files,
//!    written all-or-nothing by [`render::write`].
//!
//! Problems found along the way accumulate in a [`field_rules::Errs`] so a
//! single run reports everything wrong with the input.

pub mod addr;
pub mod checks;
pub mod compile;
pub mod decl;
pub mod discovery;
pub mod graph;
pub mod model;
pub mod network;
pub mod phys;
pub mod policy;
pub mod render;
pub mod report;
pub mod source;
