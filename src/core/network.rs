//! Network topology construction and validation.
//!
//! A network is a named directed multigraph built once from a connectivity
//! specification and read-only afterwards. Nodes are module slots, edges are
//! (from-port, to-port) labelled connections. A provide-port may fan out to
//! several use-ports; a use-port accepts exactly one inbound edge.

use std::collections::HashSet;

use crate::core::config::{ConnectivitySpec, EdgeSpec};
use crate::core::error::{CouplingError, CouplingResult};
use crate::core::types::SlotId;

/// One validated directed edge of the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: SlotId,
    pub from_port: String,
    pub to: SlotId,
    pub to_port: String,
}

/// The edges touching one slot, split by direction.
#[derive(Debug, Default)]
pub struct EdgePartition<'a> {
    /// Edges whose `to` endpoint is the slot (its use-ports).
    pub inbound: Vec<&'a Edge>,
    /// Edges whose `from` endpoint is the slot (its provide-ports).
    pub outbound: Vec<&'a Edge>,
}

/// An immutable, validated module-coupling topology.
#[derive(Debug)]
pub struct Network {
    name: String,
    slots: Vec<SlotId>,
    edges: Vec<Edge>,
}

impl Network {
    /// Validate a connectivity specification and build the topology.
    pub fn build(name: &str, spec: &ConnectivitySpec) -> CouplingResult<Self> {
        let mut edges = Vec::with_capacity(spec.edges.len());
        let mut slots: Vec<SlotId> = Vec::new();
        // A use endpoint may carry at most one inbound edge, and a
        // (slot, port) pair may not appear on both sides of the graph.
        let mut use_endpoints: HashSet<(String, String)> = HashSet::new();
        let mut provide_endpoints: HashSet<(String, String)> = HashSet::new();

        for (i, entry) in spec.edges.iter().enumerate() {
            let edge = Self::validate_entry(name, i, entry)?;

            let use_key = (edge.to.key(), edge.to_port.clone());
            if !use_endpoints.insert(use_key.clone()) {
                return Err(CouplingError::InvalidTopology {
                    network: name.to_string(),
                    reason: format!(
                        "use-port '{}' on slot '{}' has more than one inbound edge",
                        edge.to_port, edge.to
                    ),
                });
            }
            let provide_key = (edge.from.key(), edge.from_port.clone());
            if use_endpoints.contains(&provide_key) || provide_endpoints.contains(&use_key) {
                return Err(CouplingError::InvalidTopology {
                    network: name.to_string(),
                    reason: format!(
                        "edge {}.{} -> {}.{} reuses a port endpoint in the opposite direction",
                        edge.from, edge.from_port, edge.to, edge.to_port
                    ),
                });
            }
            provide_endpoints.insert(provide_key);

            for slot in [&edge.from, &edge.to] {
                if !slots.contains(slot) {
                    slots.push(slot.clone());
                }
            }
            edges.push(edge);
        }

        Ok(Self {
            name: name.to_string(),
            slots,
            edges,
        })
    }

    fn validate_entry(network: &str, index: usize, entry: &EdgeSpec) -> CouplingResult<Edge> {
        let field = |label: &str, value: &str| -> CouplingResult<String> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(CouplingError::InvalidTopology {
                    network: network.to_string(),
                    reason: format!("edge {} is missing attribute '{}'", index, label),
                });
            }
            Ok(trimmed.to_string())
        };

        let from_key = field("from-module-slot", &entry.from_module_slot)?;
        let to_key = field("to-module-slot", &entry.to_module_slot)?;
        let from_port = field("from-port", &entry.from_port)?;
        let to_port = field("to-port", &entry.to_port)?;

        let parse_slot = |key: &str| {
            SlotId::parse(key).map_err(|e| CouplingError::InvalidTopology {
                network: network.to_string(),
                reason: format!("edge {}: {}", index, e),
            })
        };
        let from = parse_slot(&from_key)?;
        let to = parse_slot(&to_key)?;

        if from == to && from_port == to_port {
            return Err(CouplingError::InvalidTopology {
                network: network.to_string(),
                reason: format!(
                    "edge {} is a degenerate self-loop on '{}.{}'",
                    index, from, from_port
                ),
            });
        }

        Ok(Edge {
            from,
            from_port,
            to,
            to_port,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deduplicated slot identities in first-reference order.
    pub fn slot_names(&self) -> &[SlotId] {
        &self.slots
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges touching `slot`, split into inbound (use) and outbound
    /// (provide) sides.
    pub fn edges_for(&self, slot: &SlotId) -> EdgePartition<'_> {
        let mut partition = EdgePartition::default();
        for edge in &self.edges {
            if &edge.to == slot {
                partition.inbound.push(edge);
            }
            if &edge.from == slot {
                partition.outbound.push(edge);
            }
        }
        partition
    }
}
