use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::process::{Child, Command};
use toporank_types::{Result, TopoRankError, FAILURE_EXIT_CODE};
use tracing::{info, warn};

use crate::command::LaunchCommand;
use crate::traits::{ProcessSpawner, ProcessTable, RunningProcess};

/// Process table backed by `sysinfo`. Refreshes run on the blocking pool.
#[derive(Clone)]
pub struct SysinfoProcessTable {
    system: Arc<Mutex<System>>,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
        }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessTable for SysinfoProcessTable {
    async fn find_by_name(&self, name: &str) -> Vec<u32> {
        let system = Arc::clone(&self.system);
        let name = name.to_string();
        let scan = tokio::task::spawn_blocking(move || {
            let mut sys = system.lock();
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let mut pids: Vec<u32> = sys
                .processes()
                .values()
                .filter(|p| p.name() == name.as_str() && p.status() != ProcessStatus::Zombie)
                .map(|p| p.pid().as_u32())
                .collect();
            pids.sort_unstable();
            pids
        });

        match scan.await {
            Ok(pids) => pids,
            Err(e) => {
                warn!(error = %e, "Process table scan failed");
                Vec::new()
            }
        }
    }

    async fn is_running(&self, pid: u32) -> bool {
        let system = Arc::clone(&self.system);
        let check = tokio::task::spawn_blocking(move || {
            let pid = Pid::from_u32(pid);
            let mut sys = system.lock();
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid)
                .map(|p| p.status() != ProcessStatus::Zombie)
                .unwrap_or(false)
        });

        match check.await {
            Ok(running) => running,
            Err(e) => {
                warn!(pid, error = %e, "Process liveness check failed");
                false
            }
        }
    }
}

/// Map an exit status to a shell-style exit code (128 + signal when killed)
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    FAILURE_EXIT_CODE
}

/// Spawns launch commands as direct children
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner;

#[async_trait]
impl ProcessSpawner for TokioSpawner {
    async fn spawn(&self, command: &LaunchCommand) -> Result<Box<dyn RunningProcess>> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TopoRankError::spawn(format!("failed to spawn {}: {}", command.program, e))
            })?;

        info!(pid = ?child.id(), program = %command.program, "Launcher process spawned");
        Ok(Box::new(ChildProcess {
            child,
            program: command.program.clone(),
        }))
    }
}

struct ChildProcess {
    child: Child,
    program: String,
}

#[async_trait]
impl RunningProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(self: Box<Self>) -> Result<i32> {
        let ChildProcess { mut child, program } = *self;
        let status = child
            .wait()
            .await
            .map_err(|e| TopoRankError::spawn(format!("failed to wait on {}: {}", program, e)))?;

        let code = exit_code_of(status);
        info!(code, program = %program, "Launcher process exited");
        Ok(code)
    }
}
