//! Identifier types for cluster entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier.
///
/// Opaque hostname-like string. Every node must derive the same value for a
/// given machine, since rank 0's identifier doubles as the control-plane
/// address handed to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Locality group identifier (e.g. a network spine)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalityGroup(pub String);

impl LocalityGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LocalityGroup {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LocalityGroup {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Role a node plays during launch coordination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Leader,
    Follower,
}

impl NodeRole {
    /// Leader iff the local node is the designated master (rank 0, or the
    /// bootstrap master hostname before ranks exist).
    pub fn resolve(local: &NodeId, master: &NodeId) -> Self {
        if local == master {
            Self::Leader
        } else {
            Self::Follower
        }
    }

    pub fn is_leader(self) -> bool {
        matches!(self, Self::Leader)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => write!(f, "leader"),
            Self::Follower => write!(f, "follower"),
        }
    }
}
