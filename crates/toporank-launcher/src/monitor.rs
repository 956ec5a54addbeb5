//! Follower-side observation of runtime worker processes
//!
//! The follower did not spawn the runtime's per-node worker (the leader's
//! fan-out did, through the control daemon), so it has no child handle and
//! falls back to scanning the process table by name.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::retry::{PollOutcome, Poller};
use crate::settings::ControlSettings;
use crate::traits::ProcessTable;

/// One worker process that was seen and then exited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExit {
    pub pid: u32,
    pub name: String,
    /// Time from discovery to observed exit
    pub waited: Duration,
}

/// What the follower saw of the runtime on this node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeObservation {
    pub exits: Vec<ProcessExit>,
}

impl RuntimeObservation {
    /// True when no worker appeared before the discovery ceiling
    pub fn is_empty(&self) -> bool {
        self.exits.is_empty()
    }
}

pub struct RuntimeMonitor {
    processes: Arc<dyn ProcessTable>,
    process_name: String,
    discovery: Poller,
    exit: Poller,
}

impl RuntimeMonitor {
    pub fn new(processes: Arc<dyn ProcessTable>, settings: &ControlSettings) -> Self {
        Self {
            processes,
            process_name: settings.worker_process_name.clone(),
            discovery: settings.discovery_poller(),
            exit: settings.exit_poller(),
        }
    }

    /// Wait for the worker processes to appear, then for all of them to
    /// exit. Never failing to appear is not an error.
    pub async fn observe(&self) -> RuntimeObservation {
        let name = self.process_name.as_str();
        let found = self
            .discovery
            .until(|_| async move {
                let pids = self.processes.find_by_name(name).await;
                (!pids.is_empty()).then_some(pids)
            })
            .await;

        let pids = match found {
            PollOutcome::Ready(pids) => pids,
            PollOutcome::TimedOut { attempts, elapsed } => {
                warn!(
                    process = name,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Runtime worker never appeared; nothing to monitor"
                );
                return RuntimeObservation::default();
            }
        };

        info!(process = name, pids = ?pids, "Runtime worker processes found");
        let exits = join_all(pids.into_iter().map(|pid| self.wait_for_exit(pid))).await;
        RuntimeObservation { exits }
    }

    async fn wait_for_exit(&self, pid: u32) -> ProcessExit {
        let start = Instant::now();
        self.exit
            .until(|_| async move {
                let running = self.processes.is_running(pid).await;
                debug!(pid, running, "Checked runtime worker");
                (!running).then_some(())
            })
            .await;

        let waited = start.elapsed();
        info!(pid, process = %self.process_name, waited_ms = waited.as_millis() as u64, "Runtime worker exited");
        ProcessExit {
            pid,
            name: self.process_name.clone(),
            waited,
        }
    }
}
