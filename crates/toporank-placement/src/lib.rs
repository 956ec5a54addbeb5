//! # toporank placement
//!
//! Turns the output of a latency-measurement run into a global rank order.
//!
//! ```text
//! node_to_spine.txt ──► TopologyMap ──► place_optimized / place_worst_case ──► RankAssignment
//!   "<node> <group>"     group → [node]        (pipeline × data-parallel grid)     index = rank
//! ```
//!
//! Both stages are deterministic: every node reads the same file with the same
//! degrees and independently arrives at the same assignment, so no
//! coordination service is needed to agree on ranks.

pub mod assignment;
pub mod placement;
pub mod topology;

pub use assignment::RankAssignment;
pub use placement::{cross_group_pipeline_links, place, place_optimized, place_worst_case};
pub use topology::{parse_topology, read_topology, TopologyMap};

pub use toporank_types::{PlacementParams, PlacementStrategy, Result, TopoRankError};
