//! Leader/follower launch coordination
//!
//! Every node runs one [`Coordinator`] with the same [`LaunchPlan`]. The
//! node at rank 0 leads: it starts the control daemon, waits until every
//! follower is reachable, and spawns a single fan-out command. Followers
//! wait for the leader, start their own daemon, publish their environment
//! and then watch the runtime's worker processes until they exit.
//!
//! The direct back-end skips all of that: every node spawns its own
//! distributed-runtime command pointed at the master's rendezvous endpoint.
//!
//! The control daemon is shut down on every exit path once it has started.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use toporank_types::{LauncherBackend, NodeId, NodeRole, Result, TopoRankError};
use tracing::{debug, info, warn};

use crate::command::{mpirun_command, torchrun_command, LaunchCommand, LaunchPlan};
use crate::environment::propagate_environment;
use crate::monitor::{RuntimeMonitor, RuntimeObservation};
use crate::retry::PollOutcome;
use crate::settings::CoordinatorSettings;
use crate::traits::{ControlDaemon, DaemonHandle, ProcessSpawner, ProcessTable, ReachabilityProbe};

/// Coordinator states, logged at INFO on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingForLeader,
    StartingControlDaemon,
    WaitingForFollowers,
    PropagatingEnvironment,
    ConstructingCommand,
    Spawning,
    WaitingForExit,
    MonitoringRuntime,
    CleaningUp,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::WaitingForLeader => "waiting_for_leader",
            Phase::StartingControlDaemon => "starting_control_daemon",
            Phase::WaitingForFollowers => "waiting_for_followers",
            Phase::PropagatingEnvironment => "propagating_environment",
            Phase::ConstructingCommand => "constructing_command",
            Phase::Spawning => "spawning",
            Phase::WaitingForExit => "waiting_for_exit",
            Phase::MonitoringRuntime => "monitoring_runtime",
            Phase::CleaningUp => "cleaning_up",
        };
        write!(f, "{}", name)
    }
}

/// How this node's part of the launch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum LaunchOutcome {
    /// The fan-out command exited with `exit_code`
    Leader { exit_code: i32 },
    /// The runtime workers observed on this node have all exited
    Follower { observation: RuntimeObservation },
    /// This node's direct runtime command exited with `exit_code`
    Direct { exit_code: i32 },
}

impl LaunchOutcome {
    /// Exit code the coordinator process should report
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Leader { exit_code } | Self::Direct { exit_code } => *exit_code,
            Self::Follower { .. } => 0,
        }
    }
}

/// External collaborators a coordinator drives
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn ReachabilityProbe>,
    pub daemon: Arc<dyn ControlDaemon>,
    pub processes: Arc<dyn ProcessTable>,
    pub spawner: Arc<dyn ProcessSpawner>,
}

pub struct Coordinator {
    local: NodeId,
    settings: CoordinatorSettings,
    collaborators: Collaborators,
}

impl Coordinator {
    pub fn new(local: NodeId, settings: CoordinatorSettings, collaborators: Collaborators) -> Self {
        Self {
            local,
            settings,
            collaborators,
        }
    }

    /// Run this node's part of `plan` with the chosen back-end
    pub async fn launch(&self, plan: &LaunchPlan, backend: LauncherBackend) -> Result<LaunchOutcome> {
        plan.validate()?;
        let rank = plan.assignment.require_rank(&self.local)?;
        let role = plan.assignment.role_of(&self.local);
        info!(
            host = %self.local,
            rank,
            role = %role,
            backend = %backend,
            master = %plan.master(),
            "Launching"
        );

        match (backend, role) {
            (LauncherBackend::Mpirun, NodeRole::Leader) => {
                let exit_code = self.run_leader(plan).await?;
                Ok(LaunchOutcome::Leader { exit_code })
            }
            (LauncherBackend::Mpirun, NodeRole::Follower) => {
                let observation = self.run_follower(plan.master()).await?;
                Ok(LaunchOutcome::Follower { observation })
            }
            (LauncherBackend::Torchrun, _) => {
                let exit_code = self.run_direct(plan).await?;
                Ok(LaunchOutcome::Direct { exit_code })
            }
        }
    }

    /// Leader protocol. Returns the fan-out command's exit code.
    pub async fn run_leader(&self, plan: &LaunchPlan) -> Result<i32> {
        let daemon = self.start_daemon(NodeRole::Leader).await?;
        let result = self.lead(plan).await;
        self.clean_up(NodeRole::Leader, daemon).await;
        result
    }

    async fn lead(&self, plan: &LaunchPlan) -> Result<i32> {
        self.enter(NodeRole::Leader, Phase::WaitingForFollowers);
        let followers: Vec<NodeId> = plan.assignment.followers().cloned().collect();
        self.wait_until_all_reachable(&followers).await?;

        self.enter(NodeRole::Leader, Phase::ConstructingCommand);
        let command = mpirun_command(plan, &self.settings.mpirun)?;

        self.execute(NodeRole::Leader, &command).await
    }

    /// Follower protocol. Never fails because the runtime did not show up.
    pub async fn run_follower(&self, leader: &NodeId) -> Result<RuntimeObservation> {
        self.enter(NodeRole::Follower, Phase::WaitingForLeader);
        self.wait_until_reachable(leader).await?;
        info!(leader = %leader, "Leader online");

        let daemon = self.start_daemon(NodeRole::Follower).await?;
        let result = self.follow().await;
        self.clean_up(NodeRole::Follower, daemon).await;
        result
    }

    async fn follow(&self) -> Result<RuntimeObservation> {
        let control = &self.settings.control;

        self.enter(NodeRole::Follower, Phase::PropagatingEnvironment);
        propagate_environment(&control.environment_file, std::env::vars()).await?;

        self.enter(NodeRole::Follower, Phase::MonitoringRuntime);
        let monitor = RuntimeMonitor::new(Arc::clone(&self.collaborators.processes), control);
        let observation = monitor.observe().await;
        info!(exited = observation.exits.len(), "Runtime finished on this node");
        Ok(observation)
    }

    /// Direct back-end: no daemon, every node spawns its own command.
    pub async fn run_direct(&self, plan: &LaunchPlan) -> Result<i32> {
        let role = plan.assignment.role_of(&self.local);
        self.enter(role, Phase::ConstructingCommand);
        let command = torchrun_command(plan, &self.local, &self.settings.torchrun)?;
        self.execute(role, &command).await
    }

    async fn execute(&self, role: NodeRole, command: &LaunchCommand) -> Result<i32> {
        self.enter(role, Phase::Spawning);
        info!(command = %command, "Running command");
        let child = self.collaborators.spawner.spawn(command).await?;

        self.enter(role, Phase::WaitingForExit);
        debug!(pid = ?child.id(), "Waiting for the process to finish");
        let exit_code = child.wait().await?;
        info!(exit_code, "Received exit code from launched process");
        Ok(exit_code)
    }

    async fn start_daemon(&self, role: NodeRole) -> Result<Box<dyn DaemonHandle>> {
        self.enter(role, Phase::StartingControlDaemon);
        self.collaborators.daemon.start().await
    }

    async fn clean_up(&self, role: NodeRole, daemon: Box<dyn DaemonHandle>) {
        self.enter(role, Phase::CleaningUp);
        if let Err(e) = daemon.shutdown().await {
            warn!(error = %e, "Failed to stop control daemon");
        }
    }

    async fn wait_until_all_reachable(&self, hosts: &[NodeId]) -> Result<()> {
        info!(count = hosts.len(), "Waiting for followers to become reachable");
        let results = join_all(hosts.iter().map(|host| self.wait_until_reachable(host))).await;
        results.into_iter().collect()
    }

    async fn wait_until_reachable(&self, host: &NodeId) -> Result<()> {
        let probe = &self.collaborators.probe;
        let outcome = self
            .settings
            .control
            .probe_poller()
            .until(|attempt| async move {
                if probe.can_reach(host).await {
                    Some(())
                } else {
                    debug!(host = %host, attempt, "Host not reachable yet");
                    None
                }
            })
            .await;

        match outcome {
            PollOutcome::Ready(()) => {
                info!(host = %host, "Host available for communication");
                Ok(())
            }
            PollOutcome::TimedOut { attempts, elapsed } => Err(TopoRankError::timeout(format!(
                "{} unreachable after {} attempts over {:?}",
                host, attempts, elapsed
            ))),
        }
    }

    fn enter(&self, role: NodeRole, phase: Phase) {
        info!(host = %self.local, role = %role, phase = %phase, "Coordinator phase");
    }
}
