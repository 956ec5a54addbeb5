//! CLI configuration management
//!
//! Handles loading, saving and validating the `toporank.toml` file and
//! turning it into the explicit settings the launcher crate consumes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use toporank_launcher::probe::{SshProbe, TcpProbe};
use toporank_launcher::{
    ControlSettings, CoordinatorSettings, MpirunOptions, ReachabilityProbe, TopologyDiscovery,
    TorchrunOptions,
};
use toporank_types::{LauncherBackend, Result, TopoRankError};

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Where the topology file lives
    pub topology: TopologyConfig,

    /// Latency-calculator run that produces the topology file
    pub discovery: DiscoveryConfig,

    /// Job launcher back-end
    pub launcher: LauncherConfig,

    /// Control daemon and reachability probing
    pub control: ControlConfig,

    /// Cluster membership outside managed training environments
    pub cluster: ClusterConfig,
}

/// Topology file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Directory the topology file is written into
    pub output_dir: String,

    /// Topology file name
    pub file_name: String,

    /// Poll interval while waiting for the file
    pub poll_interval_ms: u64,
}

/// Discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Latency calculator executable; discovery is skipped when unset
    pub executable: Option<String>,

    /// Calculator processes per host
    pub processes_per_host: usize,
}

/// Launcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// `mpirun` or `torchrun`; anything else falls back to `torchrun`
    pub backend: String,

    /// Training processes per host
    pub processes_per_host: usize,

    /// Parallel command runner binary
    pub mpirun_path: String,

    /// Distributed runtime launcher binary
    pub torchrun_path: String,

    /// Interpreter placed before the entry point (e.g. `python`)
    pub interpreter: Option<String>,

    /// Rendezvous port on the master node
    pub rendezvous_port: u16,

    /// Rendezvous job id
    pub rendezvous_id: String,

    /// Extra flags passed to the parallel command runner
    pub extra_mpi_args: Vec<String>,
}

/// How peers are checked for reachability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Run a no-op command over SSH
    #[default]
    Ssh,
    /// Only open a TCP connection to the SSH port
    Tcp,
}

/// Control-plane configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Remote-execution daemon binary
    pub daemon_path: String,

    /// Daemon arguments (must keep it in the foreground)
    pub daemon_args: Vec<String>,

    /// Reachability check used while waiting for peers
    pub probe: ProbeKind,

    /// SSH client used for reachability probes
    pub ssh_path: String,

    /// SSH port
    pub ssh_port: u16,

    /// Interval between reachability probes
    pub probe_interval_ms: u64,

    /// Per-attempt probe timeout
    pub probe_timeout_secs: u64,

    /// Overall ceiling on reachability waits; unbounded when unset
    pub probe_ceiling_secs: Option<u64>,

    /// Runtime worker process name watched by followers
    pub worker_process_name: String,

    /// Ceiling on worker discovery
    pub worker_discovery_timeout_secs: u64,

    /// Worker discovery poll interval
    pub worker_discovery_interval_ms: u64,

    /// Shared environment file appended by followers
    pub environment_file: String,
}

/// Cluster membership configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// File listing one host per line
    pub hostfile: Option<String>,

    /// Static host list, used when no hostfile is given
    pub hosts: Vec<String>,
}

impl CliConfig {
    /// Load configuration from file. A missing file yields the defaults.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            TopoRankError::io(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| TopoRankError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                TopoRankError::io(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .await
            .map_err(|e| TopoRankError::io(format!("Failed to write config file: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TopoRankError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.topology.file_name.trim().is_empty() {
            return Err(TopoRankError::config("Topology file name cannot be empty"));
        }
        if self.topology.poll_interval_ms == 0 {
            return Err(TopoRankError::config("Topology poll interval cannot be 0"));
        }

        if self.discovery.processes_per_host == 0 {
            return Err(TopoRankError::config(
                "Discovery processes per host cannot be 0",
            ));
        }

        if self.launcher.processes_per_host == 0 {
            return Err(TopoRankError::config("Processes per host cannot be 0"));
        }
        if self.launcher.rendezvous_port == 0 {
            return Err(TopoRankError::config("Rendezvous port cannot be 0"));
        }

        if self.control.probe_interval_ms == 0 {
            return Err(TopoRankError::config("Probe interval cannot be 0"));
        }
        if self.control.probe_timeout_secs == 0 {
            return Err(TopoRankError::config("Probe timeout cannot be 0"));
        }
        if self.control.worker_discovery_interval_ms == 0 {
            return Err(TopoRankError::config(
                "Worker discovery interval cannot be 0",
            ));
        }
        if self.control.worker_process_name.trim().is_empty() {
            return Err(TopoRankError::config("Worker process name cannot be empty"));
        }

        Ok(())
    }

    /// Back-end selected by the config file, and whether it fell back
    pub fn backend(&self) -> (LauncherBackend, bool) {
        LauncherBackend::parse_lenient(&self.launcher.backend)
    }

    pub fn topology_path(&self) -> PathBuf {
        Path::new(&self.topology.output_dir).join(&self.topology.file_name)
    }

    /// Reachability probe selected by `control.probe`
    pub fn reachability_probe(&self) -> Arc<dyn ReachabilityProbe> {
        let control = &self.control;
        let attempt_timeout = Duration::from_secs(control.probe_timeout_secs);
        match control.probe {
            ProbeKind::Ssh => Arc::new(SshProbe::new(
                &control.ssh_path,
                control.ssh_port,
                attempt_timeout,
            )),
            ProbeKind::Tcp => Arc::new(TcpProbe::new(control.ssh_port, attempt_timeout)),
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        let control = &self.control;
        CoordinatorSettings {
            control: ControlSettings {
                probe_interval: Duration::from_millis(control.probe_interval_ms),
                probe_ceiling: control.probe_ceiling_secs.map(Duration::from_secs),
                worker_process_name: control.worker_process_name.clone(),
                worker_discovery_interval: Duration::from_millis(
                    control.worker_discovery_interval_ms,
                ),
                worker_discovery_timeout: Duration::from_secs(
                    control.worker_discovery_timeout_secs,
                ),
                environment_file: PathBuf::from(&control.environment_file),
                ..ControlSettings::default()
            },
            mpirun: MpirunOptions {
                program: self.launcher.mpirun_path.clone(),
                extra_args: self.launcher.extra_mpi_args.clone(),
            },
            torchrun: TorchrunOptions {
                program: self.launcher.torchrun_path.clone(),
                rendezvous_port: self.launcher.rendezvous_port,
                rendezvous_id: self.launcher.rendezvous_id.clone(),
            },
        }
    }

    /// Discovery run for the configured calculator, if any
    pub fn topology_discovery(&self) -> Option<TopologyDiscovery> {
        let executable = self.discovery.executable.as_ref()?;
        let mut discovery = self.topology_watcher();
        discovery.executable = executable.clone();
        discovery.processes_per_host = self.discovery.processes_per_host;
        Some(discovery)
    }

    /// Waits for an externally produced topology file
    pub fn topology_watcher(&self) -> TopologyDiscovery {
        TopologyDiscovery::new(String::new(), &self.topology.output_dir)
            .with_file_name(self.topology.file_name.clone())
            .with_poll_interval(Duration::from_millis(self.topology.poll_interval_ms))
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            output_dir: "/opt/ml/code/".to_string(),
            file_name: "node_to_spine.txt".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            executable: None,
            processes_per_host: 1,
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let mpirun = MpirunOptions::default();
        let torchrun = TorchrunOptions::default();
        Self {
            backend: LauncherBackend::default().to_string(),
            processes_per_host: 8,
            mpirun_path: mpirun.program,
            torchrun_path: torchrun.program,
            interpreter: None,
            rendezvous_port: torchrun.rendezvous_port,
            rendezvous_id: torchrun.rendezvous_id,
            extra_mpi_args: mpirun.extra_args,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            daemon_path: "/usr/sbin/sshd".to_string(),
            daemon_args: vec!["-D".to_string()],
            probe: ProbeKind::Ssh,
            ssh_path: "ssh".to_string(),
            ssh_port: 22,
            probe_interval_ms: 1000,
            probe_timeout_secs: 30,
            probe_ceiling_secs: None,
            worker_process_name: "orted".to_string(),
            worker_discovery_timeout_secs: 20 * 60,
            worker_discovery_interval_ms: 10,
            environment_file: "/etc/environment".to_string(),
        }
    }
}
