//! Launch plans and the commands built from them

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use toporank_placement::RankAssignment;
use toporank_types::{NodeId, Result, TopoRankError};

use crate::settings::{MpirunOptions, TorchrunOptions};

/// What to run, where, and in which rank order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub entry_point: String,
    pub processes_per_host: usize,
    pub assignment: RankAssignment,
    /// Passed as the first positional argument after the entry point
    pub working_dir: Option<PathBuf>,
    /// Placed before the entry point, e.g. `python`
    pub interpreter: Option<String>,
    /// Forwarded verbatim after everything else
    pub args: Vec<String>,
}

impl LaunchPlan {
    pub fn new(entry_point: impl Into<String>, assignment: RankAssignment) -> Self {
        Self {
            entry_point: entry_point.into(),
            processes_per_host: 1,
            assignment,
            working_dir: None,
            interpreter: None,
            args: Vec::new(),
        }
    }

    pub fn with_processes_per_host(mut self, processes_per_host: usize) -> Self {
        self.processes_per_host = processes_per_host;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Rank 0, the control-plane address
    pub fn master(&self) -> &NodeId {
        self.assignment.master()
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry_point.trim().is_empty() {
            return Err(TopoRankError::invalid_parameter("entry point must not be empty"));
        }
        if self.processes_per_host == 0 {
            return Err(TopoRankError::invalid_parameter(
                "processes_per_host must be at least 1",
            ));
        }
        Ok(())
    }

    /// `[interpreter] entry_point [working_dir] args...`
    fn program_tail(&self) -> Vec<String> {
        let mut tail = Vec::with_capacity(self.args.len() + 3);
        if let Some(interpreter) = &self.interpreter {
            tail.push(interpreter.clone());
        }
        tail.push(self.entry_point.clone());
        if let Some(dir) = &self.working_dir {
            tail.push(dir.display().to_string());
        }
        tail.extend(self.args.iter().cloned());
        tail
    }
}

/// A fully resolved program invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Single fan-out invocation covering every node in rank order.
pub fn mpirun_command(plan: &LaunchPlan, options: &MpirunOptions) -> Result<LaunchCommand> {
    plan.validate()?;

    let hosts = plan.assignment.nodes();
    let per_host = plan.processes_per_host;
    let host_list = hosts
        .iter()
        .map(|host| {
            if per_host == 1 {
                host.to_string()
            } else {
                format!("{}:{}", host, per_host)
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    let mut args = vec![
        "--host".to_string(),
        host_list,
        "-np".to_string(),
        (hosts.len() * per_host).to_string(),
        "--allow-run-as-root".to_string(),
        "--mca".to_string(),
        "orte_abort_on_non_zero_status".to_string(),
        "1".to_string(),
    ];
    args.extend(options.extra_args.iter().cloned());
    args.push("-x".to_string());
    args.push(format!("MASTER_ADDR={}", plan.master()));
    args.extend(plan.program_tail());

    Ok(LaunchCommand {
        program: options.program.clone(),
        args,
    })
}

/// Per-node invocation addressed to the master's rendezvous endpoint.
pub fn torchrun_command(
    plan: &LaunchPlan,
    node: &NodeId,
    options: &TorchrunOptions,
) -> Result<LaunchCommand> {
    plan.validate()?;
    let rank = plan.assignment.require_rank(node)?;

    let mut args = vec![
        format!("--nnodes={}", plan.assignment.len()),
        format!("--node_rank={}", rank),
        format!("--nproc_per_node={}", plan.processes_per_host),
        format!("--rdzv_endpoint={}:{}", plan.master(), options.rendezvous_port),
        format!("--rdzv_id={}", options.rendezvous_id),
    ];
    args.extend(plan.program_tail());

    Ok(LaunchCommand {
        program: options.program.clone(),
        args,
    })
}
