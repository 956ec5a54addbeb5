//! Launch command - discover topology, place ranks and start the job

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::*;
use serde::Serialize;
use toporank_launcher::probe::{SshDaemon, SysinfoProcessTable, TokioSpawner};
use toporank_launcher::{Collaborators, Coordinator, LaunchOutcome, LaunchPlan};
use toporank_placement::{place, TopologyMap};
use toporank_types::{LauncherBackend, NodeId, PlacementStrategy, Result};
use tracing::{info, warn};

use super::rank::PlacementArgs;
use crate::config::CliConfig;
use crate::output::{print_output, print_success, print_warning, OutputFormat};
use crate::platform::ClusterEnvironment;

#[derive(Args, Debug)]
pub struct LaunchCommand {
    #[command(flatten)]
    pub placement: PlacementArgs,

    /// Training entry point
    #[arg(long)]
    pub entry_point: String,

    /// `mpirun` or `torchrun` (unknown values fall back to torchrun)
    #[arg(long)]
    pub launcher: Option<String>,

    /// File listing one host per line
    #[arg(long)]
    pub hostfile: Option<PathBuf>,

    /// Read an externally produced topology file instead of running discovery
    #[arg(long)]
    pub skip_discovery: bool,

    /// Training processes per host
    #[arg(long)]
    pub processes_per_host: Option<usize>,

    /// Arguments forwarded verbatim to the entry point
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Summary printed after the job
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub host: NodeId,
    pub rank: usize,
    pub backend: LauncherBackend,
    pub strategy: PlacementStrategy,
    pub ranking: Vec<NodeId>,
    pub outcome: LaunchOutcome,
}

/// Resolve the back-end from the flag or config, warning on fallback
pub fn resolve_backend(flag: Option<&str>, config: &CliConfig) -> LauncherBackend {
    let requested = flag.unwrap_or(&config.launcher.backend);
    let (backend, fell_back) = LauncherBackend::parse_lenient(requested);
    if fell_back {
        warn!(requested, "Unsupported launcher, defaulting to torchrun");
        print_warning(&format!(
            "Launcher {:?} is not supported, defaulting to {}",
            requested, backend
        ));
    }
    backend
}

fn collaborators(config: &CliConfig) -> Collaborators {
    let control = &config.control;
    Collaborators {
        probe: config.reachability_probe(),
        daemon: Arc::new(SshDaemon::new(&control.daemon_path, control.daemon_args.clone())),
        processes: Arc::new(SysinfoProcessTable::new()),
        spawner: Arc::new(TokioSpawner),
    }
}

/// Run the full flow and return the exit code to report
pub async fn execute(cmd: LaunchCommand, config: CliConfig, format: OutputFormat) -> Result<i32> {
    config.validate()?;
    let params = cmd.placement.params();
    let strategy = cmd.placement.strategy();
    let backend = resolve_backend(cmd.launcher.as_deref(), &config);

    let cluster = ClusterEnvironment::detect(&config.cluster, cmd.hostfile.as_deref()).await?;
    let local = cluster.current_host.clone();
    let coordinator = Coordinator::new(
        local.clone(),
        config.coordinator_settings(),
        collaborators(&config),
    );

    let topology = load_topology(&cmd, &config, &coordinator, &cluster).await?;
    info!(
        nodes = topology.node_count(),
        groups = topology.group_count(),
        "Topology mapping ready"
    );

    let assignment = place(&topology, &params, strategy)?;
    let rank = assignment.require_rank(&local)?;
    info!(
        strategy = %strategy,
        ranking = ?assignment.nodes().iter().map(NodeId::as_str).collect::<Vec<_>>(),
        master = %assignment.master(),
        rank,
        "Rank assignment computed"
    );

    let ranking = assignment.nodes().to_vec();
    let plan = LaunchPlan::new(cmd.entry_point, assignment)
        .with_processes_per_host(
            cmd.processes_per_host
                .unwrap_or(config.launcher.processes_per_host),
        )
        .with_interpreter(config.launcher.interpreter.clone())
        .with_args(cmd.args);

    let outcome = coordinator.launch(&plan, backend).await?;
    let exit_code = outcome.exit_code();

    let report = LaunchReport {
        host: local,
        rank,
        backend,
        strategy,
        ranking,
        outcome,
    };
    if format.is_structured() {
        print_output(&report, format)?;
    } else if exit_code == 0 {
        print_success(&format!(
            "Job finished on {} (rank {}, {})",
            report.host, report.rank, report.backend
        ));
    } else {
        eprintln!(
            "{} Job exited with code {} on {}",
            "✗".red().bold(),
            exit_code,
            report.host
        );
    }

    Ok(exit_code)
}

async fn load_topology(
    cmd: &LaunchCommand,
    config: &CliConfig,
    coordinator: &Coordinator,
    cluster: &toporank_types::ClusterSpec,
) -> Result<TopologyMap> {
    match config.topology_discovery() {
        Some(discovery) if !cmd.skip_discovery => discovery.run(coordinator, cluster).await,
        _ => {
            let watcher = config.topology_watcher();
            info!(path = %watcher.topology_path().display(), "Waiting for topology file");
            watcher.wait_for_topology().await
        }
    }
}
