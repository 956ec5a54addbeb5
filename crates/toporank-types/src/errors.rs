//! Error types for toporank

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process exit code reserved for configuration errors.
pub const CONFIGURATION_EXIT_CODE: i32 = 2;

/// Process exit code for coordinator failures that are neither configuration
/// errors nor a propagated runtime exit status.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Main error type for toporank operations
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopoRankError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameters (zero degrees, empty host lists, ...)
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// A topology line that is not exactly `<node-id> <locality-group-id>`
    #[error("Malformed topology record at line {line}: {record:?}")]
    MalformedTopologyRecord { line: usize, record: String },

    /// The topology file has not been produced yet
    #[error("Topology file {path} unavailable: {message}")]
    TopologyUnavailable { path: String, message: String },

    /// A node listed in more than one locality group
    #[error("Node {node} appears in locality groups {first_group} and {second_group}")]
    DuplicateNode {
        node: String,
        first_group: String,
        second_group: String,
    },

    /// pipeline_degree * data_parallel_degree does not match the node count
    #[error(
        "pipeline_degree ({pipeline_degree}) * data_parallel_degree ({data_parallel_degree}) \
         must equal the number of nodes ({node_count})"
    )]
    DegreeMismatch {
        pipeline_degree: usize,
        data_parallel_degree: usize,
        node_count: usize,
    },

    /// Every locality group ran dry before the rank grid was filled
    #[error("Placement exhausted all locality groups after {filled} of {expected} ranks")]
    PlacementExhausted { filled: usize, expected: usize },

    /// The local node is absent from the computed ranking
    #[error("Node {node} is not part of the rank assignment")]
    NodeNotInAssignment { node: String },

    /// The control daemon binary is absent on this node
    #[error("Control daemon not found at {path}")]
    ControlDaemonMissing { path: String },

    /// A bounded wait ran out of time
    #[error("Operation timed out: {message}")]
    Timeout { message: String },

    /// Failure to spawn or wait on a child process
    #[error("Spawn error: {message}")]
    Spawn { message: String },

    /// I/O errors
    #[error("I/O error: {message}")]
    IO { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TopoRankError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a malformed topology record error
    pub fn malformed_record(line: usize, record: impl Into<String>) -> Self {
        Self::MalformedTopologyRecord {
            line,
            record: record.into(),
        }
    }

    /// Create a topology unavailable error
    pub fn topology_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TopologyUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a degree mismatch error
    pub fn degree_mismatch(
        pipeline_degree: usize,
        data_parallel_degree: usize,
        node_count: usize,
    ) -> Self {
        Self::DegreeMismatch {
            pipeline_degree,
            data_parallel_degree,
            node_count,
        }
    }

    /// Create a control daemon missing error
    pub fn control_daemon_missing(path: impl Into<String>) -> Self {
        Self::ControlDaemonMissing { path: path.into() }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::IO {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Configuration errors are fatal and never retried
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidParameter { .. }
                | Self::MalformedTopologyRecord { .. }
                | Self::DuplicateNode { .. }
                | Self::DegreeMismatch { .. }
                | Self::NodeNotInAssignment { .. }
                | Self::ControlDaemonMissing { .. }
        )
    }

    /// Check if this is a transient readiness error worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TopologyUnavailable { .. })
    }

    /// Exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration_error() {
            CONFIGURATION_EXIT_CODE
        } else {
            FAILURE_EXIT_CODE
        }
    }
}

/// Conversion from std::io::Error
impl From<std::io::Error> for TopoRankError {
    fn from(err: std::io::Error) -> Self {
        Self::io(format!("{}", err))
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for TopoRankError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("{}", err))
    }
}

/// Conversion from toml::de::Error
impl From<toml::de::Error> for TopoRankError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("{}", err))
    }
}
