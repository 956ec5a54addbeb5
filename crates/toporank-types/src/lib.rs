//! Core type definitions for toporank
//!
//! This crate holds the identifiers, placement parameters, launcher selection
//! and error definitions shared by the topology reader, the placement engine,
//! the launch coordinator and the CLI. It has no async or I/O dependencies so
//! every other crate can depend on it.

pub mod config;
pub mod errors;
pub mod ids;

// Re-export commonly used types
pub use config::*;
pub use errors::*;
pub use ids::*;

/// Result type used throughout toporank
pub type Result<T> = std::result::Result<T, TopoRankError>;
