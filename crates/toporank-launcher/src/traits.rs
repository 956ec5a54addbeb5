//! Seams between the coordinators and the outside world
//!
//! Each trait has one production implementation in [`crate::probe`]; tests
//! substitute in-memory fakes so the leader and follower state machines can
//! run without SSH, sshd or real child processes.

use async_trait::async_trait;
use toporank_types::{NodeId, Result};

use crate::command::LaunchCommand;

/// Answers "can this node reach `host` over the control channel right now?"
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// One attempt. Failures of any kind are reported as `false`.
    async fn can_reach(&self, host: &NodeId) -> bool;
}

/// Starts the remote-execution daemon that lets the launcher fan out
#[async_trait]
pub trait ControlDaemon: Send + Sync {
    /// Start the daemon, or fail with `ControlDaemonMissing` when its binary
    /// is absent on this node.
    async fn start(&self) -> Result<Box<dyn DaemonHandle>>;
}

/// A running control daemon owned by the coordinator
#[async_trait]
pub trait DaemonHandle: Send {
    /// OS process id, if the daemon is backed by one
    fn id(&self) -> Option<u32>;

    /// Terminate the daemon and reap it
    async fn shutdown(self: Box<Self>) -> Result<()>;
}

/// Read-only view of the local process table
#[async_trait]
pub trait ProcessTable: Send + Sync {
    /// Pids of live processes whose name equals `name`
    async fn find_by_name(&self, name: &str) -> Vec<u32>;

    async fn is_running(&self, pid: u32) -> bool;
}

/// Starts launch commands as children of this coordinator
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(&self, command: &LaunchCommand) -> Result<Box<dyn RunningProcess>>;
}

/// Handle to a spawned launch command
#[async_trait]
pub trait RunningProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Wait for exit and return the exit code, `128 + signal` when the
    /// process was killed by a signal
    async fn wait(self: Box<Self>) -> Result<i32>;
}
