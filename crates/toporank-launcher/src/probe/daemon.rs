use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use toporank_types::{Result, TopoRankError};
use tracing::{debug, info};

use crate::traits::{ControlDaemon, DaemonHandle};

/// Runs the SSH daemon in the foreground so the coordinator owns its lifetime
#[derive(Debug, Clone)]
pub struct SshDaemon {
    path: PathBuf,
    args: Vec<String>,
}

impl SshDaemon {
    pub fn new(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }
}

impl Default for SshDaemon {
    fn default() -> Self {
        Self::new("/usr/sbin/sshd", vec!["-D".to_string()])
    }
}

#[async_trait]
impl ControlDaemon for SshDaemon {
    async fn start(&self) -> Result<Box<dyn DaemonHandle>> {
        if tokio::fs::metadata(&self.path).await.is_err() {
            return Err(TopoRankError::control_daemon_missing(
                self.path.display().to_string(),
            ));
        }

        let child = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TopoRankError::spawn(format!("failed to start {}: {}", self.path.display(), e))
            })?;

        info!(path = %self.path.display(), pid = ?child.id(), "Control daemon started");
        Ok(Box::new(ChildDaemon::new(child)))
    }
}

/// A daemon backed by a child process
pub struct ChildDaemon {
    child: Child,
}

impl ChildDaemon {
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

#[async_trait]
impl DaemonHandle for ChildDaemon {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        let mut child = self.child;
        let pid = child.id();
        if let Some(status) = child.try_wait()? {
            debug!(pid = ?pid, status = ?status.code(), "Control daemon already exited");
            return Ok(());
        }
        child.kill().await?;
        info!(pid = ?pid, "Control daemon terminated");
        Ok(())
    }
}
