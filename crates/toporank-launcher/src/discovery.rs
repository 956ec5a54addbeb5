//! Topology discovery
//!
//! Before ranks can be placed, a latency-measurement executable runs once on
//! every host (through the same leader/follower protocol) and writes the
//! `<node> <group>` topology file. Discovery orders hosts by name, so the
//! alphabetically first host leads this phase regardless of the final
//! ranking.

use std::path::PathBuf;
use std::time::Duration;

use toporank_placement::{parse_topology, RankAssignment, TopologyMap};
use toporank_types::{ClusterSpec, LauncherBackend, Result, TopoRankError};
use tracing::{debug, info, warn};

use crate::command::LaunchPlan;
use crate::coordinator::Coordinator;
use crate::retry::{PollOutcome, Poller};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDiscovery {
    /// Latency calculator to fan out
    pub executable: String,
    /// Directory the calculator writes into, passed as its first argument
    pub output_dir: PathBuf,
    pub file_name: String,
    pub processes_per_host: usize,
    pub poll_interval: Duration,
    pub poll_ceiling: Option<Duration>,
}

impl TopologyDiscovery {
    pub fn new(executable: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            output_dir: output_dir.into(),
            file_name: "node_to_spine.txt".to_string(),
            processes_per_host: 1,
            poll_interval: Duration::from_secs(1),
            poll_ceiling: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_ceiling(mut self, ceiling: Option<Duration>) -> Self {
        self.poll_ceiling = ceiling;
        self
    }

    pub fn topology_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// The discovery launch over `cluster`'s hosts in sorted order
    pub fn plan(&self, cluster: &ClusterSpec) -> Result<LaunchPlan> {
        let assignment = RankAssignment::new(cluster.hosts.clone())?;
        Ok(LaunchPlan::new(self.executable.clone(), assignment)
            .with_processes_per_host(self.processes_per_host)
            .with_working_dir(self.output_dir.clone()))
    }

    /// Run the calculator on every host, then read the file it produced
    pub async fn run(&self, coordinator: &Coordinator, cluster: &ClusterSpec) -> Result<TopologyMap> {
        let plan = self.plan(cluster)?;
        info!(
            executable = %self.executable,
            hosts = cluster.len(),
            master = %plan.master(),
            "Computing topology mapping"
        );

        let outcome = coordinator.launch(&plan, LauncherBackend::Mpirun).await?;
        let code = outcome.exit_code();
        if code != 0 {
            return Err(TopoRankError::spawn(format!(
                "topology discovery exited with code {}",
                code
            )));
        }

        self.wait_for_topology().await
    }

    /// Poll until the topology file exists and holds at least one record.
    /// Anything other than "not there yet" fails immediately.
    pub async fn wait_for_topology(&self) -> Result<TopologyMap> {
        let path = self.topology_path();
        let outcome = Poller::every(self.poll_interval)
            .with_optional_ceiling(self.poll_ceiling)
            .until(|attempt| {
                let path = path.clone();
                async move {
                    match load(&path).await {
                        Ok(topology) => Some(Ok(topology)),
                        Err(e) if e.is_retryable() => {
                            debug!(attempt, error = %e, "Topology not ready");
                            None
                        }
                        Err(e) => Some(Err(e)),
                    }
                }
            })
            .await;

        match outcome {
            PollOutcome::Ready(result) => {
                let topology = result?;
                info!(
                    path = %path.display(),
                    nodes = topology.node_count(),
                    groups = topology.group_count(),
                    "Topology mapping loaded"
                );
                Ok(topology)
            }
            PollOutcome::TimedOut { attempts, elapsed } => {
                warn!(path = %path.display(), attempts, "Gave up waiting for topology file");
                Err(TopoRankError::timeout(format!(
                    "topology file {} not available after {:?}",
                    path.display(),
                    elapsed
                )))
            }
        }
    }
}

async fn load(path: &std::path::Path) -> Result<TopologyMap> {
    let display = path.display().to_string();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TopoRankError::topology_unavailable(&display, e.to_string()))?;
    let topology = parse_topology(&contents)?;
    if topology.is_empty() {
        return Err(TopoRankError::topology_unavailable(display, "file is empty"));
    }
    Ok(topology)
}
