use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use toporank_types::NodeId;
use tracing::{debug, trace};

use crate::traits::ReachabilityProbe;

/// Probes a host by running a no-op command over non-interactive SSH.
///
/// Each attempt is bounded by `attempt_timeout` and the ssh child is killed
/// if the attempt is abandoned.
#[derive(Debug, Clone)]
pub struct SshProbe {
    ssh_path: PathBuf,
    port: u16,
    attempt_timeout: Duration,
}

impl SshProbe {
    pub fn new(ssh_path: impl Into<PathBuf>, port: u16, attempt_timeout: Duration) -> Self {
        Self {
            ssh_path: ssh_path.into(),
            port,
            attempt_timeout,
        }
    }

    fn command(&self, host: &NodeId) -> Command {
        let mut cmd = Command::new(&self.ssh_path);
        cmd.args([
            "-o",
            "BatchMode=yes",
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            &format!("ConnectTimeout={}", self.attempt_timeout.as_secs().max(1)),
            "-p",
            &self.port.to_string(),
            host.as_str(),
            "true",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
        cmd
    }
}

impl Default for SshProbe {
    fn default() -> Self {
        Self::new("ssh", 22, Duration::from_secs(30))
    }
}

#[async_trait]
impl ReachabilityProbe for SshProbe {
    async fn can_reach(&self, host: &NodeId) -> bool {
        match timeout(self.attempt_timeout, self.command(host).status()).await {
            Ok(Ok(status)) if status.success() => {
                debug!(host = %host, "Can connect to host");
                true
            }
            Ok(Ok(status)) => {
                trace!(host = %host, status = ?status.code(), "Cannot connect to host");
                false
            }
            Ok(Err(e)) => {
                trace!(host = %host, error = %e, "Failed to run ssh");
                false
            }
            Err(_) => {
                trace!(host = %host, timeout_secs = self.attempt_timeout.as_secs(), "SSH probe timed out");
                false
            }
        }
    }
}

/// Probes a host by opening a TCP connection to a fixed port.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    port: u16,
    attempt_timeout: Duration,
}

impl TcpProbe {
    pub fn new(port: u16, attempt_timeout: Duration) -> Self {
        Self {
            port,
            attempt_timeout,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn can_reach(&self, host: &NodeId) -> bool {
        let addr = (host.as_str(), self.port);
        match timeout(self.attempt_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                debug!(host = %host, port = self.port, "Can connect to host");
                true
            }
            Ok(Err(e)) => {
                trace!(host = %host, port = self.port, error = %e, "Cannot connect to host");
                false
            }
            Err(_) => {
                trace!(host = %host, port = self.port, "TCP probe timed out");
                false
            }
        }
    }
}
