//! Rank placement strategies
//!
//! Ranks are laid out on an `outer × inner` grid where, for the default
//! data-parallel-major layout, `outer` is the data-parallel degree and
//! `inner` the pipeline degree. Grid cell `(i, j)` maps to rank
//! `i + j * outer`, so the `inner` cells of one row are the members of one
//! pipeline group, `outer` ranks apart from each other.
//!
//! [`place_optimized`] fills rows from the locality-ordered node list, which
//! keeps each pipeline group inside as few locality groups as possible and
//! pushes cross-spine traffic onto the data-parallel dimension.
//! [`place_worst_case`] fills the same grid round-robin across locality
//! groups, which scatters pipeline peers. It exists only to benchmark the
//! benefit of the first.

use std::collections::VecDeque;

use toporank_types::{NodeId, PlacementParams, PlacementStrategy, Result, TopoRankError};
use tracing::debug;

use crate::{RankAssignment, TopologyMap};

/// Place with the given strategy
pub fn place(
    topology: &TopologyMap,
    params: &PlacementParams,
    strategy: PlacementStrategy,
) -> Result<RankAssignment> {
    match strategy {
        PlacementStrategy::Optimized => place_optimized(topology, params),
        PlacementStrategy::WorstCase => place_worst_case(topology, params),
    }
}

/// Locality-optimized placement.
///
/// With `optimize_for_pipeline` off, ranks follow the flattened locality
/// order directly.
pub fn place_optimized(topology: &TopologyMap, params: &PlacementParams) -> Result<RankAssignment> {
    params.check_node_count(topology.node_count())?;

    let flattened = topology.flattened();
    if !params.optimize_for_pipeline {
        debug!(nodes = flattened.len(), "Pipeline optimization disabled, using locality order");
        return RankAssignment::new(flattened);
    }

    let (outer, inner) = params.grid();
    let mut ranking: Vec<Option<NodeId>> = vec![None; flattened.len()];
    let mut nodes = flattened.into_iter();

    for i in 0..outer {
        for j in 0..inner {
            ranking[i + j * outer] = nodes.next();
        }
    }

    finish(ranking, PlacementStrategy::Optimized)
}

/// Pessimal placement for comparative benchmarking.
///
/// Walks the grid in the same order as [`place_optimized`] but takes each
/// cell's node from the next non-empty locality group in a rotating cursor,
/// so consecutive pipeline peers come from different groups whenever more
/// than one group still has nodes. `optimize_for_pipeline` is ignored.
pub fn place_worst_case(topology: &TopologyMap, params: &PlacementParams) -> Result<RankAssignment> {
    let count = topology.node_count();
    params.check_node_count(count)?;

    let mut queues: Vec<VecDeque<NodeId>> = topology
        .groups()
        .map(|(_, nodes)| nodes.iter().cloned().collect())
        .collect();
    let group_count = queues.len();

    let (outer, inner) = params.grid();
    let mut ranking: Vec<Option<NodeId>> = vec![None; count];
    let mut cursor = 0;
    let mut filled = 0;

    for i in 0..outer {
        for j in 0..inner {
            let mut skipped = 0;
            while queues[cursor].is_empty() {
                skipped += 1;
                if skipped >= group_count {
                    return Err(TopoRankError::PlacementExhausted {
                        filled,
                        expected: count,
                    });
                }
                cursor = (cursor + 1) % group_count;
            }

            ranking[i + j * outer] = queues[cursor].pop_front();
            filled += 1;
            cursor = (cursor + 1) % group_count;
        }
    }

    finish(ranking, PlacementStrategy::WorstCase)
}

fn finish(ranking: Vec<Option<NodeId>>, strategy: PlacementStrategy) -> Result<RankAssignment> {
    let expected = ranking.len();
    let nodes = ranking
        .into_iter()
        .enumerate()
        .map(|(rank, node)| {
            node.ok_or_else(|| TopoRankError::internal(format!("rank {} left unassigned", rank)))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(ranks = expected, %strategy, "Computed rank assignment");
    RankAssignment::new(nodes)
}

/// Count neighbouring pipeline peers that sit in different locality groups.
///
/// Lower is better. This is the figure of merit used to compare the two
/// strategies on a given topology.
pub fn cross_group_pipeline_links(
    topology: &TopologyMap,
    assignment: &RankAssignment,
    params: &PlacementParams,
) -> usize {
    let (outer, inner) = params.grid();
    let nodes = assignment.nodes();
    let mut links = 0;

    for i in 0..outer {
        for j in 1..inner {
            let (Some(prev), Some(next)) = (nodes.get(i + (j - 1) * outer), nodes.get(i + j * outer))
            else {
                continue;
            };
            if topology.group_of(prev) != topology.group_of(next) {
                links += 1;
            }
        }
    }

    links
}
