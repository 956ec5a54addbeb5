//! Final rank order

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use toporank_types::{NodeId, NodeRole, Result, TopoRankError};

/// Ordered node list whose index is the global rank.
///
/// Never empty and free of duplicates. Rank 0 is the control-plane master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankAssignment {
    nodes: Vec<NodeId>,
}

impl RankAssignment {
    /// Wrap an explicit rank order
    pub fn new(nodes: Vec<NodeId>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(TopoRankError::invalid_parameter(
                "rank assignment must contain at least one node",
            ));
        }

        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node) {
                return Err(TopoRankError::internal(format!(
                    "node {} assigned more than one rank",
                    node
                )));
            }
        }

        Ok(Self { nodes })
    }

    /// Rank 0, also the runtime's master address
    pub fn master(&self) -> &NodeId {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn rank_of(&self, node: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n == node)
    }

    /// Rank of `node`, failing if it was not part of the topology
    pub fn require_rank(&self, node: &NodeId) -> Result<usize> {
        self.rank_of(node)
            .ok_or_else(|| TopoRankError::NodeNotInAssignment {
                node: node.to_string(),
            })
    }

    pub fn role_of(&self, node: &NodeId) -> NodeRole {
        NodeRole::resolve(node, self.master())
    }

    /// Every node except rank 0
    pub fn followers(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().skip(1)
    }
}
