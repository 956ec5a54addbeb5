mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use toporank_launcher::*;
use toporank_types::{ClusterSpec, LauncherBackend, NodeId, TopoRankError};

fn plan(hosts: &[&str]) -> LaunchPlan {
    LaunchPlan::new("train.py", assignment(hosts))
        .with_processes_per_host(8)
        .with_interpreter(Some("python".to_string()))
        .with_args(vec!["--epochs".to_string(), "2".to_string()])
}

#[tokio::test]
async fn leader_waits_for_every_follower_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h1",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone())
            .unreachable_for("h3", 3)
            .unreachable_for("h4", 5),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    let outcome = h
        .coordinator
        .launch(&plan(&["h1", "h3", "h2", "h4"]), LauncherBackend::Mpirun)
        .await
        .unwrap();

    assert_eq!(outcome, LaunchOutcome::Leader { exit_code: 0 });
    assert_eq!(h.probe.attempts("h1"), 0, "leader never probes itself");
    assert_eq!(h.probe.attempts("h3"), 4);
    assert_eq!(h.probe.attempts("h4"), 6);

    let spawn = position(&log, "spawn");
    assert!(position(&log, "daemon:start") < position(&log, "reachable:h2"));
    for host in ["h2", "h3", "h4"] {
        assert!(position(&log, &format!("reachable:{host}")) < spawn);
    }
    assert!(position(&log, "exit") < position(&log, "daemon:stop"));

    let commands = h.spawner.commands();
    assert_eq!(commands.len(), 1);
    let cmd = commands[0].to_string();
    assert!(cmd.starts_with("mpirun --host h1:8,h3:8,h2:8,h4:8 -np 32 "));
    assert!(cmd.ends_with("-x MASTER_ADDR=h1 python train.py --epochs 2"));
}

#[tokio::test]
async fn leader_probes_followers_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let probe = Arc::new(SlowProbe::new(Duration::from_millis(200)));
    let coordinator = Coordinator::new(
        NodeId::from("h1"),
        fast_settings(&dir.path().join("environment")),
        Collaborators {
            probe: probe.clone(),
            daemon: Arc::new(FakeDaemon::new(log.clone())),
            processes: Arc::new(FakeProcessTable::empty()),
            spawner: Arc::new(FakeSpawner::exiting_with(log.clone(), 0)),
        },
    );

    let start = Instant::now();
    let outcome = coordinator
        .launch(&plan(&["h1", "h2", "h3", "h4", "h5"]), LauncherBackend::Mpirun)
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(probe.peak(), 4, "all followers probed at once");
    assert!(
        start.elapsed() < Duration::from_millis(700),
        "waiting took {:?}, about the sum of the probes",
        start.elapsed()
    );
}

#[tokio::test]
async fn leader_propagates_non_zero_exit_and_still_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h1",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 3),
    );

    let outcome = h
        .coordinator
        .launch(&plan(&["h1", "h2"]), LauncherBackend::Mpirun)
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(count(&log, "daemon:stop"), 1);
}

#[tokio::test]
async fn spawn_failure_still_stops_the_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h1",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::failing(log.clone()),
    );

    let err = h
        .coordinator
        .launch(&plan(&["h1", "h2"]), LauncherBackend::Mpirun)
        .await
        .unwrap_err();

    assert!(matches!(err, TopoRankError::Spawn { .. }));
    assert_eq!(count(&log, "daemon:start"), 1);
    assert_eq!(count(&log, "daemon:stop"), 1);
}

#[tokio::test]
async fn missing_daemon_is_fatal_before_any_probe() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h1",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::missing(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    let err = h
        .coordinator
        .launch(&plan(&["h1", "h2"]), LauncherBackend::Mpirun)
        .await
        .unwrap_err();

    assert_eq!(err, TopoRankError::control_daemon_missing("/usr/sbin/sshd"));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(h.probe.attempts("h2"), 0);
    assert!(h.spawner.commands().is_empty());
}

#[tokio::test]
async fn probe_ceiling_surfaces_timeout_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let mut settings = fast_settings(&dir.path().join("environment"));
    settings.control.probe_ceiling = Some(Duration::from_millis(20));

    let h = Harness::new(
        "h1",
        settings,
        log.clone(),
        ScriptedProbe::new(log.clone()).never_reachable("h2"),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    let err = h
        .coordinator
        .launch(&plan(&["h1", "h2"]), LauncherBackend::Mpirun)
        .await
        .unwrap_err();

    assert!(matches!(err, TopoRankError::Timeout { .. }));
    assert!(h.spawner.commands().is_empty());
    assert_eq!(count(&log, "daemon:stop"), 1);
}

#[tokio::test]
async fn follower_publishes_environment_and_watches_workers() {
    let dir = tempfile::tempdir().unwrap();
    let env_file = dir.path().join("environment");
    let log = events();
    let h = Harness::new(
        "h3",
        fast_settings(&env_file),
        log.clone(),
        ScriptedProbe::new(log.clone()).unreachable_for("h1", 2),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::with_workers(vec![101, 102], 3, 4),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    let outcome = h
        .coordinator
        .launch(&plan(&["h1", "h3", "h2", "h4"]), LauncherBackend::Mpirun)
        .await
        .unwrap();

    let LaunchOutcome::Follower { observation } = &outcome else {
        panic!("expected follower outcome, got {outcome:?}");
    };
    let mut pids: Vec<u32> = observation.exits.iter().map(|e| e.pid).collect();
    pids.sort_unstable();
    assert_eq!(pids, [101, 102]);
    assert!(observation.exits.iter().all(|e| e.name == "orted"));
    assert_eq!(outcome.exit_code(), 0);

    assert_eq!(h.probe.attempts("h1"), 3);
    assert!(position(&log, "reachable:h1") < position(&log, "daemon:start"));
    assert_eq!(count(&log, "daemon:stop"), 1);
    assert!(h.spawner.commands().is_empty(), "followers never spawn");

    let env = std::fs::read_to_string(&env_file).unwrap();
    assert!(!env.is_empty());
    assert!(env.lines().all(|line| line.contains('=')));
}

#[tokio::test]
async fn follower_without_workers_observes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h2",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    let observation = h
        .coordinator
        .run_follower(&NodeId::from("h1"))
        .await
        .unwrap();

    assert!(observation.is_empty());
    assert_eq!(count(&log, "daemon:stop"), 1);
}

#[tokio::test]
async fn direct_launch_runs_without_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h2",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 5),
    );

    let plan = LaunchPlan::new("train.py", assignment(&["h1", "h3", "h2", "h4"]))
        .with_processes_per_host(8)
        .with_args(vec!["--lr".to_string(), "0.1".to_string()]);
    let outcome = h
        .coordinator
        .launch(&plan, LauncherBackend::Torchrun)
        .await
        .unwrap();

    assert_eq!(outcome, LaunchOutcome::Direct { exit_code: 5 });
    assert_eq!(count(&log, "daemon:"), 0);
    assert_eq!(
        h.spawner.commands()[0].to_string(),
        "torchrun --nnodes=4 --node_rank=2 --nproc_per_node=8 \
         --rdzv_endpoint=h1:29400 --rdzv_id=100 train.py --lr 0.1"
    );
}

#[tokio::test]
async fn local_host_outside_assignment_is_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "h9",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    for backend in [LauncherBackend::Mpirun, LauncherBackend::Torchrun] {
        let err = h
            .coordinator
            .launch(&plan(&["h1", "h2"]), backend)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoRankError::NodeNotInAssignment { .. }));
    }
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn discovery_runs_calculator_from_first_sorted_host() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topology");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("node_to_spine.txt"), "a g1\nb g1\nc g2\n").unwrap();

    let log = events();
    let h = Harness::new(
        "a",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 0),
    );

    let cluster = ClusterSpec::new(
        ["c", "b", "a"].map(NodeId::from),
        NodeId::from("a"),
    )
    .unwrap();
    let discovery = TopologyDiscovery::new("bin/latency_calculator", &out)
        .with_poll_interval(Duration::from_millis(5));

    let topology = discovery.run(&h.coordinator, &cluster).await.unwrap();
    assert_eq!(topology.node_count(), 3);

    let cmd = h.spawner.commands()[0].to_string();
    assert!(cmd.contains("--host a,b,c -np 3 "));
    assert!(cmd.ends_with(&format!("bin/latency_calculator {}", out.display())));
}

#[tokio::test]
async fn failed_discovery_run_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let log = events();
    let h = Harness::new(
        "a",
        fast_settings(&dir.path().join("environment")),
        log.clone(),
        ScriptedProbe::new(log.clone()),
        FakeDaemon::new(log.clone()),
        FakeProcessTable::empty(),
        FakeSpawner::exiting_with(log.clone(), 1),
    );

    let cluster = ClusterSpec::new(["a", "b"].map(NodeId::from), NodeId::from("a")).unwrap();
    let discovery = TopologyDiscovery::new("bin/latency_calculator", dir.path());

    let err = discovery.run(&h.coordinator, &cluster).await.unwrap_err();
    assert!(matches!(err, TopoRankError::Spawn { .. }));
}
