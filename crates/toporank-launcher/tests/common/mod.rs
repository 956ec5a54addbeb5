//! In-memory collaborators shared by the coordinator tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use toporank_launcher::*;
use toporank_placement::RankAssignment;
use toporank_types::{NodeId, Result, TopoRankError};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn events() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn position(log: &EventLog, event: &str) -> usize {
    log.lock()
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("event {event:?} not recorded in {:?}", log.lock()))
}

pub fn count(log: &EventLog, prefix: &str) -> usize {
    log.lock().iter().filter(|e| e.starts_with(prefix)).count()
}

pub fn assignment(hosts: &[&str]) -> RankAssignment {
    RankAssignment::new(hosts.iter().map(|h| NodeId::from(*h)).collect()).unwrap()
}

pub fn fast_settings(environment_file: &Path) -> CoordinatorSettings {
    CoordinatorSettings {
        control: ControlSettings {
            probe_interval: Duration::from_millis(1),
            probe_ceiling: None,
            worker_process_name: "orted".to_string(),
            worker_discovery_interval: Duration::from_millis(1),
            worker_discovery_timeout: Duration::from_millis(50),
            worker_exit_interval: Duration::from_millis(1),
            environment_file: environment_file.to_path_buf(),
        },
        ..Default::default()
    }
}

/// Reports a host reachable once it has been probed more than `after` times
pub struct ScriptedProbe {
    log: EventLog,
    after: HashMap<NodeId, u64>,
    attempts: Mutex<HashMap<NodeId, u64>>,
}

impl ScriptedProbe {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            after: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn unreachable_for(mut self, host: &str, attempts: u64) -> Self {
        self.after.insert(NodeId::from(host), attempts);
        self
    }

    pub fn never_reachable(self, host: &str) -> Self {
        self.unreachable_for(host, u64::MAX)
    }

    pub fn attempts(&self, host: &str) -> u64 {
        self.attempts
            .lock()
            .get(&NodeId::from(host))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn can_reach(&self, host: &NodeId) -> bool {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let n = attempts.entry(host.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let reachable = attempt > self.after.get(host).copied().unwrap_or(0);
        if reachable {
            self.log.lock().push(format!("reachable:{host}"));
        }
        reachable
    }
}

/// Every probe holds for `hold` before answering, recording how many
/// probes were in flight at once
pub struct SlowProbe {
    hold: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowProbe {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for SlowProbe {
    async fn can_reach(&self, _host: &NodeId) -> bool {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        true
    }
}

pub struct FakeDaemon {
    log: EventLog,
    missing: bool,
}

impl FakeDaemon {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            missing: false,
        }
    }

    pub fn missing(log: EventLog) -> Self {
        Self { log, missing: true }
    }
}

#[async_trait]
impl ControlDaemon for FakeDaemon {
    async fn start(&self) -> Result<Box<dyn DaemonHandle>> {
        if self.missing {
            return Err(TopoRankError::control_daemon_missing("/usr/sbin/sshd"));
        }
        self.log.lock().push("daemon:start".to_string());
        Ok(Box::new(FakeDaemonHandle {
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeDaemonHandle {
    log: EventLog,
}

#[async_trait]
impl DaemonHandle for FakeDaemonHandle {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        self.log.lock().push("daemon:stop".to_string());
        Ok(())
    }
}

/// Workers appear after `appear_after` scans and each stays alive for
/// `alive_checks` liveness checks
pub struct FakeProcessTable {
    pids: Vec<u32>,
    appear_after: u64,
    alive_checks: u32,
    scans: Mutex<u64>,
    checks: Mutex<HashMap<u32, u32>>,
}

impl FakeProcessTable {
    pub fn with_workers(pids: Vec<u32>, appear_after: u64, alive_checks: u32) -> Self {
        Self {
            pids,
            appear_after,
            alive_checks,
            scans: Mutex::new(0),
            checks: Mutex::new(HashMap::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_workers(Vec::new(), 0, 0)
    }
}

#[async_trait]
impl ProcessTable for FakeProcessTable {
    async fn find_by_name(&self, name: &str) -> Vec<u32> {
        assert_eq!(name, "orted");
        let mut scans = self.scans.lock();
        *scans += 1;
        if *scans > self.appear_after {
            self.pids.clone()
        } else {
            Vec::new()
        }
    }

    async fn is_running(&self, pid: u32) -> bool {
        let mut checks = self.checks.lock();
        let n = checks.entry(pid).or_insert(0);
        *n += 1;
        *n <= self.alive_checks
    }
}

pub struct FakeSpawner {
    log: EventLog,
    exit_code: i32,
    fail: bool,
    commands: Mutex<Vec<LaunchCommand>>,
}

impl FakeSpawner {
    pub fn exiting_with(log: EventLog, exit_code: i32) -> Self {
        Self {
            log,
            exit_code,
            fail: false,
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(log: EventLog) -> Self {
        Self {
            fail: true,
            ..Self::exiting_with(log, 0)
        }
    }

    pub fn commands(&self) -> Vec<LaunchCommand> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl ProcessSpawner for FakeSpawner {
    async fn spawn(&self, command: &LaunchCommand) -> Result<Box<dyn RunningProcess>> {
        self.commands.lock().push(command.clone());
        if self.fail {
            return Err(TopoRankError::spawn("no such file"));
        }
        self.log.lock().push("spawn".to_string());
        Ok(Box::new(FakeProcess {
            log: Arc::clone(&self.log),
            exit_code: self.exit_code,
        }))
    }
}

struct FakeProcess {
    log: EventLog,
    exit_code: i32,
}

#[async_trait]
impl RunningProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(1)
    }

    async fn wait(self: Box<Self>) -> Result<i32> {
        self.log.lock().push("exit".to_string());
        Ok(self.exit_code)
    }
}

pub struct Harness {
    pub log: EventLog,
    pub probe: Arc<ScriptedProbe>,
    pub spawner: Arc<FakeSpawner>,
    pub coordinator: Coordinator,
}

impl Harness {
    pub fn new(
        local: &str,
        settings: CoordinatorSettings,
        log: EventLog,
        probe: ScriptedProbe,
        daemon: FakeDaemon,
        processes: FakeProcessTable,
        spawner: FakeSpawner,
    ) -> Self {
        let probe = Arc::new(probe);
        let spawner = Arc::new(spawner);
        let collaborators = Collaborators {
            probe: probe.clone(),
            daemon: Arc::new(daemon),
            processes: Arc::new(processes),
            spawner: spawner.clone(),
        };
        Self {
            log,
            probe,
            spawner,
            coordinator: Coordinator::new(NodeId::from(local), settings, collaborators),
        }
    }
}
