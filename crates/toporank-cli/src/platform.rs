//! Cluster membership detection
//!
//! This is the only place that reads the ambient environment to learn which
//! hosts take part in the job. Managed training environments publish the
//! host list as JSON in `SM_HOSTS` and the local name in `SM_CURRENT_HOST`
//! (signalled by `SM_TRAINING_ENV`); everywhere else a hostfile or the
//! configured host list is combined with the local hostname.

use std::path::Path;

use toporank_types::{ClusterSpec, NodeId, Result, TopoRankError};
use tracing::{debug, info};

use crate::config::ClusterConfig;

pub const TRAINING_ENV_VAR: &str = "SM_TRAINING_ENV";
pub const HOSTS_VAR: &str = "SM_HOSTS";
pub const CURRENT_HOST_VAR: &str = "SM_CURRENT_HOST";

/// Snapshot of the environment variables and hostname membership depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEnvironment {
    pub training_env: Option<String>,
    pub hosts_json: Option<String>,
    pub current_host: Option<String>,
    pub hostname: String,
}

impl ClusterEnvironment {
    /// Read the process environment and local hostname
    pub fn capture() -> Self {
        Self {
            training_env: std::env::var(TRAINING_ENV_VAR).ok(),
            hosts_json: std::env::var(HOSTS_VAR).ok(),
            current_host: std::env::var(CURRENT_HOST_VAR).ok(),
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }

    pub fn is_managed(&self) -> bool {
        self.training_env.is_some()
    }

    /// Capture the environment and resolve membership in one step
    pub async fn detect(cluster: &ClusterConfig, hostfile: Option<&Path>) -> Result<ClusterSpec> {
        Self::capture().resolve(cluster, hostfile).await
    }

    /// Resolve membership. `hostfile` overrides the configured hostfile.
    pub async fn resolve(&self, cluster: &ClusterConfig, hostfile: Option<&Path>) -> Result<ClusterSpec> {
        if self.is_managed() {
            return self.managed_cluster();
        }

        let current = NodeId::new(self.hostname.clone());
        let hostfile = hostfile.or(cluster.hostfile.as_deref().map(Path::new));
        let hosts = match hostfile {
            Some(path) => read_hostfile(path).await?,
            None if !cluster.hosts.is_empty() => {
                cluster.hosts.iter().map(|h| NodeId::new(h.trim())).collect()
            }
            None => {
                debug!(host = %current, "No host list configured, running single-node");
                vec![current.clone()]
            }
        };

        let spec = ClusterSpec::new(hosts, current)?;
        info!(hosts = spec.len(), current = %spec.current_host, "Cluster membership resolved");
        Ok(spec)
    }

    fn managed_cluster(&self) -> Result<ClusterSpec> {
        let hosts_json = self
            .hosts_json
            .as_deref()
            .ok_or_else(|| TopoRankError::config(format!("{} is not set", HOSTS_VAR)))?;
        let hosts: Vec<String> = serde_json::from_str(hosts_json).map_err(|e| {
            TopoRankError::config(format!("{} is not a JSON list of hosts: {}", HOSTS_VAR, e))
        })?;
        let current = self
            .current_host
            .as_deref()
            .ok_or_else(|| TopoRankError::config(format!("{} is not set", CURRENT_HOST_VAR)))?;

        let spec = ClusterSpec::new(hosts.into_iter().map(NodeId::new), NodeId::new(current))?;
        info!(hosts = spec.len(), current = %spec.current_host, "Managed cluster membership resolved");
        Ok(spec)
    }
}

/// One host per line. Blank lines and `#` comments are ignored, and only the
/// first field is used so MPI-style `host slots=N` lines work.
pub fn parse_hostfile(contents: &str) -> Vec<NodeId> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .filter_map(|line| line.split_whitespace().next())
        .map(NodeId::from)
        .collect()
}

async fn read_hostfile(path: &Path) -> Result<Vec<NodeId>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        TopoRankError::config(format!("Failed to read hostfile {}: {}", path.display(), e))
    })?;
    Ok(parse_hostfile(&contents))
}
