//! Configuration command implementation

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use colored::*;
use toporank_types::{Result, TopoRankError};

use crate::config::CliConfig;
use crate::output::{print_output, print_success, print_warning, OutputFormat};

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Output file (defaults to the --config path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

pub async fn execute(
    cmd: ConfigCommand,
    config: CliConfig,
    config_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    match cmd.action {
        ConfigAction::Show => show_config(&config, format),
        ConfigAction::Init { output, force } => {
            init_config(output.as_deref().unwrap_or(config_path), force).await
        }
        ConfigAction::Validate => validate_config(&config),
    }
}

fn show_config(config: &CliConfig, format: OutputFormat) -> Result<()> {
    if format.is_structured() {
        return print_output(config, format);
    }

    println!("{}", config.to_toml()?);
    Ok(())
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(TopoRankError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    CliConfig::default().save(path).await?;
    print_success(&format!("Wrote default configuration to {}", path.display()));
    Ok(())
}

fn validate_config(config: &CliConfig) -> Result<()> {
    if let Err(e) = config.validate() {
        eprintln!("{} Configuration validation failed: {}", "✗".red(), e);
        return Err(e);
    }

    let (backend, fell_back) = config.backend();
    if fell_back {
        print_warning(&format!(
            "Launcher {:?} is not supported, {} will be used",
            config.launcher.backend, backend
        ));
    }

    print_success("Configuration is valid");
    Ok(())
}
