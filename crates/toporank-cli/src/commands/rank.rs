//! Rank command - read a topology file and print the resulting placement

use std::path::PathBuf;

use clap::{ArgAction, Args};
use colored::*;
use serde::Serialize;
use toporank_placement::{cross_group_pipeline_links, place, read_topology, TopologyMap};
use toporank_types::{NodeId, PlacementParams, PlacementStrategy, Result};

use crate::config::CliConfig;
use crate::output::{print_output, OutputFormat};
use crate::utils::parse_bool_flag;

/// Placement inputs shared by `rank` and `launch`
#[derive(Args, Debug, Clone)]
pub struct PlacementArgs {
    /// Pipeline-parallel degree
    #[arg(long)]
    pub pp_degree: usize,

    /// Data-parallel degree
    #[arg(long)]
    pub dp_degree: usize,

    /// Place pipeline peers next to each other (`true` / `false`)
    #[arg(long, action = ArgAction::Set, value_parser = parse_bool_flag, required = true)]
    pub optimize_for_pp: bool,

    /// Use the data-parallel axis as the outer grid index (`true` / `false`)
    #[arg(long, action = ArgAction::Set, value_parser = parse_bool_flag, required = true)]
    pub dp_major: bool,

    /// Deliberately scatter pipeline peers across locality groups
    #[arg(long)]
    pub bad_placement: bool,
}

impl PlacementArgs {
    pub fn params(&self) -> PlacementParams {
        PlacementParams::new(self.pp_degree, self.dp_degree)
            .with_optimize_for_pipeline(self.optimize_for_pp)
            .with_data_parallel_major(self.dp_major)
    }

    pub fn strategy(&self) -> PlacementStrategy {
        PlacementStrategy::from_pessimal_flag(self.bad_placement)
    }
}

#[derive(Args, Debug)]
pub struct RankCommand {
    /// Topology file (defaults to the configured output location)
    #[arg(long)]
    pub topology_file: Option<PathBuf>,

    #[command(flatten)]
    pub placement: PlacementArgs,

    /// Also report this node's rank
    #[arg(long)]
    pub host: Option<String>,
}

/// Result of a placement, as printed by `rank`
#[derive(Debug, Clone, Serialize)]
pub struct RankReport {
    pub strategy: PlacementStrategy,
    pub params: PlacementParams,
    pub ranking: Vec<NodeId>,
    pub master: NodeId,
    pub locality_groups: usize,
    /// Adjacent pipeline stages placed in different locality groups
    pub cross_group_pipeline_links: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

impl RankReport {
    pub fn build(
        topology: &TopologyMap,
        args: &PlacementArgs,
        host: Option<NodeId>,
    ) -> Result<Self> {
        let params = args.params();
        let strategy = args.strategy();
        let assignment = place(topology, &params, strategy)?;
        let rank = match &host {
            Some(node) => Some(assignment.require_rank(node)?),
            None => None,
        };

        Ok(Self {
            strategy,
            params,
            cross_group_pipeline_links: cross_group_pipeline_links(topology, &assignment, &params),
            ranking: assignment.nodes().to_vec(),
            master: assignment.master().clone(),
            locality_groups: topology.group_count(),
            host,
            rank,
        })
    }
}

pub async fn execute(cmd: RankCommand, config: CliConfig, format: OutputFormat) -> Result<()> {
    let path = cmd.topology_file.unwrap_or_else(|| config.topology_path());
    let topology = read_topology(&path)?;
    let report = RankReport::build(&topology, &cmd.placement, cmd.host.map(NodeId::new))?;

    if format.is_structured() {
        return print_output(&report, format);
    }

    println!("{} {}", "Topology:".bold(), path.display().to_string().cyan());
    println!(
        "  {} nodes in {} locality groups",
        topology.node_count(),
        topology.group_count()
    );
    println!(
        "{} {} (pp={}, dp={}, optimize_for_pp={}, dp_major={})",
        "Strategy:".bold(),
        report.strategy.to_string().cyan(),
        report.params.pipeline_degree,
        report.params.data_parallel_degree,
        report.params.optimize_for_pipeline,
        report.params.data_parallel_major
    );
    println!("{}", "Ranking:".bold());
    for (rank, node) in report.ranking.iter().enumerate() {
        let group = topology
            .group_of(node)
            .map(|g| g.to_string())
            .unwrap_or_default();
        println!("  {:>4}  {}  {}", rank, node.as_str().cyan(), group.dimmed());
    }
    println!("{} {}", "Master:".bold(), report.master.as_str().green());
    println!(
        "{} {}",
        "Cross-group pipeline links:".bold(),
        report.cross_group_pipeline_links
    );
    if let (Some(host), Some(rank)) = (&report.host, report.rank) {
        println!("{} {} has rank {}", "Host:".bold(), host.as_str().cyan(), rank);
    }

    Ok(())
}
