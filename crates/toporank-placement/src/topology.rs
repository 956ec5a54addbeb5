//! Topology file reader
//!
//! The topology source writes one `<node-id> <locality-group-id>` record per
//! line. Line order is significant: it fixes both the order of groups and
//! the order of nodes inside each group.

use std::collections::HashMap;
use std::path::Path;

use toporank_types::{LocalityGroup, NodeId, Result, TopoRankError};
use tracing::debug;

/// Locality group → ordered member nodes, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyMap {
    groups: Vec<(LocalityGroup, Vec<NodeId>)>,
    membership: HashMap<NodeId, usize>,
}

impl TopologyMap {
    /// Build a map from `(node, group)` records in file order
    pub fn from_records<N, G>(records: impl IntoIterator<Item = (N, G)>) -> Result<Self>
    where
        N: Into<NodeId>,
        G: Into<LocalityGroup>,
    {
        let mut map = Self::default();
        for (node, group) in records {
            map.insert(node.into(), group.into())?;
        }
        Ok(map)
    }

    fn insert(&mut self, node: NodeId, group: LocalityGroup) -> Result<()> {
        if let Some(&existing) = self.membership.get(&node) {
            return Err(TopoRankError::DuplicateNode {
                node: node.0,
                first_group: self.groups[existing].0 .0.clone(),
                second_group: group.0,
            });
        }

        let idx = match self.groups.iter().position(|(g, _)| *g == group) {
            Some(idx) => idx,
            None => {
                self.groups.push((group, Vec::new()));
                self.groups.len() - 1
            }
        };
        self.groups[idx].1.push(node.clone());
        self.membership.insert(node, idx);
        Ok(())
    }

    /// Groups in first-seen order with their members in insertion order
    pub fn groups(&self) -> impl Iterator<Item = (&LocalityGroup, &[NodeId])> {
        self.groups.iter().map(|(g, nodes)| (g, nodes.as_slice()))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of nodes across all groups
    pub fn node_count(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    pub fn group_of(&self, node: &NodeId) -> Option<&LocalityGroup> {
        self.membership.get(node).map(|&idx| &self.groups[idx].0)
    }

    /// All nodes, group by group
    pub fn flattened(&self) -> Vec<NodeId> {
        self.groups
            .iter()
            .flat_map(|(_, nodes)| nodes.iter().cloned())
            .collect()
    }
}

/// Parse topology file contents.
///
/// Every line must hold exactly two whitespace-separated tokens. Only the
/// terminating newline of the last record is tolerated.
pub fn parse_topology(contents: &str) -> Result<TopologyMap> {
    let mut map = TopologyMap::default();

    for (idx, line) in contents.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [node, group] => map.insert(NodeId::from(*node), LocalityGroup::from(*group))?,
            _ => return Err(TopoRankError::malformed_record(idx + 1, line)),
        }
    }

    Ok(map)
}

/// Read and parse a topology file.
///
/// A file that cannot be opened yields `TopologyUnavailable`, which callers
/// retry while the topology source is still running.
pub fn read_topology(path: impl AsRef<Path>) -> Result<TopologyMap> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        TopoRankError::topology_unavailable(path.display().to_string(), e.to_string())
    })?;

    let map = parse_topology(&contents)?;
    debug!(
        path = %path.display(),
        groups = map.group_count(),
        nodes = map.node_count(),
        "Read topology mapping"
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_keep_first_seen_order() {
        let map = parse_topology("h3 spine-b\nh1 spine-a\nh4 spine-b\nh2 spine-a\n").unwrap();
        let groups: Vec<_> = map
            .groups()
            .map(|(g, nodes)| {
                (
                    g.as_str().to_string(),
                    nodes.iter().map(|n| n.as_str().to_string()).collect::<Vec<_>>(),
                )
            })
            .collect();
        assert_eq!(
            groups,
            vec![
                ("spine-b".to_string(), vec!["h3".to_string(), "h4".to_string()]),
                ("spine-a".to_string(), vec!["h1".to_string(), "h2".to_string()]),
            ]
        );
        assert_eq!(map.node_count(), 4);
        assert_eq!(
            map.flattened(),
            vec![
                NodeId::from("h3"),
                NodeId::from("h4"),
                NodeId::from("h1"),
                NodeId::from("h2")
            ]
        );
    }

    #[test]
    fn tabs_and_extra_spaces_are_separators() {
        let map = parse_topology("h1\t spine0  \n  h2 spine0\n").unwrap();
        assert_eq!(map.node_count(), 2);
        assert_eq!(map.group_of(&NodeId::from("h2")).unwrap().as_str(), "spine0");
    }

    #[test]
    fn blank_lines_are_malformed() {
        match parse_topology("h1 g\n\nh2 g\n") {
            Err(TopoRankError::MalformedTopologyRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed record, got {other:?}"),
        }
        assert!(matches!(
            parse_topology("h1 g\n   \n"),
            Err(TopoRankError::MalformedTopologyRecord { line: 2, .. })
        ));
        assert_eq!(parse_topology("h1 g\nh2 g\n").unwrap().node_count(), 2);
    }

    #[test]
    fn wrong_token_count_is_malformed() {
        let err = parse_topology("h1 s0\nh2\n").unwrap_err();
        assert_eq!(err, TopoRankError::malformed_record(2, "h2"));

        let err = parse_topology("h1 s0 extra\n").unwrap_err();
        assert!(matches!(
            err,
            TopoRankError::MalformedTopologyRecord { line: 1, .. }
        ));
    }

    #[test]
    fn node_in_two_groups_is_rejected() {
        let err = parse_topology("h1 s0\nh1 s1\n").unwrap_err();
        assert!(matches!(err, TopoRankError::DuplicateNode { .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = read_topology("/nonexistent/toporank/node_to_spine.txt").unwrap_err();
        assert!(err.is_retryable());
    }
}
