//! toporank - topology-aware rank placement and job launch
//!
//! Every node of a distributed training job runs this binary with the same
//! arguments; each one computes the same rank order and plays its part of
//! the launch.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::*;
use toporank_cli::{
    commands::*,
    config::CliConfig,
    output::{print_error, OutputFormat},
    shutdown::shutdown_signal,
    utils::setup_logging,
};
use toporank_types::{TopoRankError, FAILURE_EXIT_CODE};

#[derive(Parser)]
#[command(name = "toporank")]
#[command(about = "Topology-aware rank placement and launch for distributed training")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "toporank.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover topology, place ranks and launch the job on this node
    Launch(LaunchCommand),

    /// Compute and print the rank placement for a topology file
    Rank(RankCommand),

    /// Show, initialize or validate configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.quiet) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(FAILURE_EXIT_CODE);
    }

    let config = match CliConfig::load(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            print_error(&e);
            process::exit(e.exit_code());
        }
    };

    let run = async {
        match cli.command {
            Commands::Launch(cmd) => launch::execute(cmd, config, cli.format).await,
            Commands::Rank(cmd) => rank::execute(cmd, config, cli.format).await.map(|_| 0),
            Commands::Config(cmd) => config_cmd::execute(cmd, config, &cli.config, cli.format)
                .await
                .map(|_| 0),
        }
    };

    let result: Result<i32, TopoRankError> = tokio::select! {
        result = run => result,
        code = shutdown_signal() => Ok(code),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            print_error(&e);
            process::exit(e.exit_code());
        }
    }
}
