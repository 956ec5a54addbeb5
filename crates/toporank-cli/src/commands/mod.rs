//! CLI command implementations

pub mod config_cmd;
pub mod launch;
pub mod rank;

// Re-exports
pub use config_cmd::ConfigCommand;
pub use launch::LaunchCommand;
pub use rank::RankCommand;
