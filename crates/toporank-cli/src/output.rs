//! Output formatting utilities

use colored::*;
use serde::Serialize;
use toporank_types::{Result, TopoRankError};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Structured formats print only machine-readable data on stdout
    pub fn is_structured(&self) -> bool {
        !matches!(self, OutputFormat::Pretty)
    }
}

/// Serialize `data` for a structured format
pub fn format_structured<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| {
            TopoRankError::serialization(format!("YAML serialization failed: {}", e))
        }),
        OutputFormat::Json | OutputFormat::Pretty => serde_json::to_string_pretty(data)
            .map_err(|e| TopoRankError::serialization(format!("JSON serialization failed: {}", e))),
    }
}

/// Print formatted output
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    println!("{}", format_structured(data, format)?);
    Ok(())
}

/// Print error with formatting
pub fn print_error(error: &TopoRankError) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}

/// Print warning with formatting
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message.green());
}
