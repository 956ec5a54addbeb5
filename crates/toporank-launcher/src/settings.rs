//! Explicit coordinator settings
//!
//! Everything the coordinators need to know about timing, process names and
//! launcher binaries arrives through these structs. They are built once at
//! the process boundary (the CLI config layer) and never read from the
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::Poller;

/// Default interval between reachability probes
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);
/// Default poll interval while looking for the runtime's worker process
pub const DEFAULT_WORKER_DISCOVERY_INTERVAL: Duration = Duration::from_millis(10);
/// Default ceiling on worker discovery
pub const DEFAULT_WORKER_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(20 * 60);
/// Default rendezvous port for the direct launch path
pub const DEFAULT_RENDEZVOUS_PORT: u16 = 29400;

/// Timing and naming for the leader/follower protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSettings {
    /// Interval between reachability probes
    pub probe_interval: Duration,
    /// Optional ceiling on reachability waits (unbounded by default)
    pub probe_ceiling: Option<Duration>,
    /// Name of the per-node process the runtime spawns on followers
    pub worker_process_name: String,
    pub worker_discovery_interval: Duration,
    pub worker_discovery_timeout: Duration,
    /// How often discovered workers are checked for exit
    pub worker_exit_interval: Duration,
    /// Shared file the follower appends its environment to
    pub environment_file: PathBuf,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe_ceiling: None,
            worker_process_name: "orted".to_string(),
            worker_discovery_interval: DEFAULT_WORKER_DISCOVERY_INTERVAL,
            worker_discovery_timeout: DEFAULT_WORKER_DISCOVERY_TIMEOUT,
            worker_exit_interval: Duration::from_millis(500),
            environment_file: PathBuf::from("/etc/environment"),
        }
    }
}

impl ControlSettings {
    pub(crate) fn probe_poller(&self) -> Poller {
        Poller::every(self.probe_interval).with_optional_ceiling(self.probe_ceiling)
    }

    pub(crate) fn discovery_poller(&self) -> Poller {
        Poller::every(self.worker_discovery_interval).with_ceiling(self.worker_discovery_timeout)
    }

    pub(crate) fn exit_poller(&self) -> Poller {
        Poller::every(self.worker_exit_interval)
    }
}

/// Parallel-command-runner (back-end A) options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpirunOptions {
    pub program: String,
    /// Flags inserted after the fixed MPI flags and before `-x MASTER_ADDR`
    pub extra_args: Vec<String>,
}

impl Default for MpirunOptions {
    fn default() -> Self {
        Self {
            program: "mpirun".to_string(),
            extra_args: vec![
                "--mca".to_string(),
                "btl_tcp_if_exclude".to_string(),
                "lo,docker0".to_string(),
            ],
        }
    }
}

/// Direct distributed-runtime (back-end B) options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorchrunOptions {
    pub program: String,
    pub rendezvous_port: u16,
    pub rendezvous_id: String,
}

impl Default for TorchrunOptions {
    fn default() -> Self {
        Self {
            program: "torchrun".to_string(),
            rendezvous_port: DEFAULT_RENDEZVOUS_PORT,
            rendezvous_id: "100".to_string(),
        }
    }
}

/// Full coordinator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub control: ControlSettings,
    pub mpirun: MpirunOptions,
    pub torchrun: TorchrunOptions,
}
