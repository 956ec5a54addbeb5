//! # toporank CLI Library
//!
//! Command-line front end for topology-aware rank placement.
//!
//! ## Commands
//!
//! - `launch`: discover the topology, place ranks and start the job
//! - `rank`: place ranks from an existing topology file and print them
//! - `config`: show, initialize or validate `toporank.toml`

pub mod commands;
pub mod config;
pub mod output;
pub mod platform;
pub mod shutdown;
pub mod utils;

// Re-exports
pub use config::CliConfig;
pub use platform::ClusterEnvironment;
