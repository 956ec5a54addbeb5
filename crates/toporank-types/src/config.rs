//! Placement parameters, launcher selection and cluster membership

use crate::{NodeId, Result, TopoRankError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parallelism degrees and optimization switches for rank placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementParams {
    /// Number of pipeline stages
    pub pipeline_degree: usize,
    /// Number of data-parallel replicas
    pub data_parallel_degree: usize,
    /// Place pipeline peers on locality-adjacent nodes
    pub optimize_for_pipeline: bool,
    /// Treat the data-parallel axis as the outer grid index
    pub data_parallel_major: bool,
}

impl PlacementParams {
    pub fn new(pipeline_degree: usize, data_parallel_degree: usize) -> Self {
        Self {
            pipeline_degree,
            data_parallel_degree,
            optimize_for_pipeline: true,
            data_parallel_major: true,
        }
    }

    pub fn with_optimize_for_pipeline(mut self, optimize: bool) -> Self {
        self.optimize_for_pipeline = optimize;
        self
    }

    pub fn with_data_parallel_major(mut self, major: bool) -> Self {
        self.data_parallel_major = major;
        self
    }

    /// Number of nodes these degrees describe, `None` on overflow
    pub fn world_size(&self) -> Option<usize> {
        self.pipeline_degree.checked_mul(self.data_parallel_degree)
    }

    /// Grid dimensions as `(outer, inner)` after the data-parallel-major swap.
    ///
    /// The outer extent is the stride between pipeline neighbours in the
    /// rank sequence.
    pub fn grid(&self) -> (usize, usize) {
        if self.data_parallel_major {
            (self.data_parallel_degree, self.pipeline_degree)
        } else {
            (self.pipeline_degree, self.data_parallel_degree)
        }
    }

    /// Fail with `DegreeMismatch` unless the degrees cover `node_count` nodes
    pub fn check_node_count(&self, node_count: usize) -> Result<()> {
        if self.pipeline_degree == 0 || self.data_parallel_degree == 0 {
            return Err(TopoRankError::invalid_parameter(format!(
                "parallel degrees must be positive (pipeline_degree={}, data_parallel_degree={})",
                self.pipeline_degree, self.data_parallel_degree
            )));
        }
        if self.world_size() != Some(node_count) {
            return Err(TopoRankError::degree_mismatch(
                self.pipeline_degree,
                self.data_parallel_degree,
                node_count,
            ));
        }
        Ok(())
    }
}

/// Which placement objective to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Locality-optimized placement for production launches
    #[default]
    Optimized,
    /// Round-robin across locality groups, for comparative benchmarking
    WorstCase,
}

impl PlacementStrategy {
    pub fn from_pessimal_flag(use_pessimal_placement: bool) -> Self {
        if use_pessimal_placement {
            Self::WorstCase
        } else {
            Self::Optimized
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimized => write!(f, "optimized"),
            Self::WorstCase => write!(f, "worst_case"),
        }
    }
}

/// External launcher back-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LauncherBackend {
    /// One parallel-command-runner invocation from the leader
    Mpirun,
    /// Every node runs the runtime directly with its own rank
    #[default]
    Torchrun,
}

impl LauncherBackend {
    /// Parse a launcher name, falling back to `Torchrun` for unknown values.
    ///
    /// Returns the backend and whether the fallback was taken.
    pub fn parse_lenient(value: &str) -> (Self, bool) {
        match value.parse() {
            Ok(backend) => (backend, false),
            Err(_) => (Self::Torchrun, true),
        }
    }
}

impl FromStr for LauncherBackend {
    type Err = TopoRankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mpirun" => Ok(Self::Mpirun),
            "torchrun" => Ok(Self::Torchrun),
            other => Err(TopoRankError::invalid_parameter(format!(
                "unsupported launcher: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for LauncherBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mpirun => write!(f, "mpirun"),
            Self::Torchrun => write!(f, "torchrun"),
        }
    }
}

/// Cluster membership as seen from one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Every host in the job, sorted
    pub hosts: Vec<NodeId>,
    /// This node
    pub current_host: NodeId,
}

impl ClusterSpec {
    /// Build a spec, sorting and de-duplicating the host list
    pub fn new(hosts: impl IntoIterator<Item = NodeId>, current_host: NodeId) -> Result<Self> {
        let mut hosts: Vec<NodeId> = hosts.into_iter().collect();
        hosts.sort();
        hosts.dedup();

        if hosts.is_empty() {
            return Err(TopoRankError::invalid_parameter("cluster host list is empty"));
        }
        if !hosts.contains(&current_host) {
            return Err(TopoRankError::config(format!(
                "current host {} is not in the cluster host list {:?}",
                current_host,
                hosts.iter().map(NodeId::as_str).collect::<Vec<_>>()
            )));
        }

        Ok(Self {
            hosts,
            current_host,
        })
    }

    /// Bootstrap master: the first host in sorted order
    pub fn bootstrap_master(&self) -> &NodeId {
        &self.hosts[0]
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
