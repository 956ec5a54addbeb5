//! Production implementations of the coordinator seams

pub mod daemon;
pub mod process;
pub mod reachability;

pub use daemon::{ChildDaemon, SshDaemon};
pub use process::{exit_code_of, SysinfoProcessTable, TokioSpawner};
pub use reachability::{SshProbe, TcpProbe};
