//! # toporank-launcher
//!
//! Runs a ranked job across a cluster. One coordinator per node takes a
//! [`LaunchPlan`] (entry point plus [`RankAssignment`](toporank_placement::RankAssignment))
//! and plays the leader or follower part of the launch protocol, or spawns
//! its own runtime command on the direct back-end.
//!
//! I/O sits behind the traits in [`traits`]: reachability probes, the
//! control daemon, the process table and the process spawner. The
//! [`probe`] module holds the SSH / sshd / sysinfo / tokio implementations.

pub mod command;
pub mod coordinator;
pub mod discovery;
pub mod environment;
pub mod monitor;
pub mod probe;
pub mod retry;
pub mod settings;
pub mod traits;

pub use command::{mpirun_command, torchrun_command, LaunchCommand, LaunchPlan};
pub use coordinator::{Collaborators, Coordinator, LaunchOutcome, Phase};
pub use discovery::TopologyDiscovery;
pub use environment::propagate_environment;
pub use monitor::{ProcessExit, RuntimeMonitor, RuntimeObservation};
pub use retry::{PollOutcome, Poller};
pub use settings::{ControlSettings, CoordinatorSettings, MpirunOptions, TorchrunOptions};
pub use traits::{
    ControlDaemon, DaemonHandle, ProcessSpawner, ProcessTable, ReachabilityProbe, RunningProcess,
};
