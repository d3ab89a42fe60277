//! End-to-end coupling runs through the public API.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coupler::core::status::{FileStatusStore, StatusStore};
use coupler::core::transport::document::DocumentHeader;
use coupler::core::transport::{Endpoint, FileReader, FileWriter, RetryPolicy};
use coupler::modules::{Collector, ConstantSource, Gain};
use coupler::{
    ConnectivitySpec, CouplingError, CouplingResult, EdgeSpec, Frame, LinkOptions, ModuleDriver,
    ModuleRegistry, Network, Port, PortDirection, Scheduler, SlotId, SlotStatus, TaskConfig,
    TaskSpec, TaskState, TimeUnit,
};

fn edge(from: &str, from_port: &str, to: &str, to_port: &str) -> EdgeSpec {
    EdgeSpec {
        from_module_slot: from.to_string(),
        to_module_slot: to.to_string(),
        from_port: from_port.to_string(),
        to_port: to_port.to_string(),
    }
}

fn task_spec() -> TaskSpec {
    TaskSpec {
        start_time: 0,
        evolve_time: 100,
        time_step: 25,
        time_unit: TimeUnit::Min,
    }
}

fn fast_config(dir: &Path) -> TaskConfig {
    TaskConfig::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_recv_timeout(Duration::from_millis(500))
        .with_work_dir(dir.to_path_buf())
}

#[test]
fn source_to_collector_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut registry = ModuleRegistry::new();
    registry
        .register("source", ConstantSource::factory(vec![("x".to_string(), 3.0)]))
        .unwrap();
    registry
        .register("sink", Collector::factory(Arc::clone(&seen)))
        .unwrap();

    let network = Network::build(
        "pair",
        &ConnectivitySpec {
            edges: vec![edge("source_1", "outflow", "sink_1", "inflow")],
        },
    )
    .unwrap();

    let mut scheduler = Scheduler::new(registry).with_config(fast_config(dir.path()));
    scheduler.add_task("pair-run", network, &task_spec()).unwrap();
    let report = scheduler.execute("pair-run").unwrap();

    assert_eq!(report.state, TaskState::Finished);
    assert!(report.error.is_none());
    assert_eq!(report.statuses.len(), 2);
    assert!(report.statuses.iter().all(|(_, s)| *s == SlotStatus::Finished));

    let frames = seen.lock().unwrap();
    let times: Vec<u64> = frames.iter().map(|f| f.time).collect();
    assert_eq!(times, vec![0, 25, 50, 75, 100]);
    assert!(frames.iter().all(|f| f.get("x") == Some(3.0)));
}

#[test]
fn gain_chain_scales_with_one_cycle_delay() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut registry = ModuleRegistry::new();
    registry
        .register("source", ConstantSource::factory(vec![("x".to_string(), 3.0)]))
        .unwrap();
    registry
        .register("gain", Gain::factory(vec!["x".to_string()], 2.0))
        .unwrap();
    registry
        .register("sink", Collector::factory(Arc::clone(&seen)))
        .unwrap();

    let network = Network::build(
        "chain",
        &ConnectivitySpec {
            edges: vec![
                edge("source_1", "outflow", "gain_1", "inflow"),
                edge("gain_1", "outflow", "sink_1", "inflow"),
            ],
        },
    )
    .unwrap();

    let mut scheduler = Scheduler::new(registry).with_config(fast_config(dir.path()));
    scheduler.add_task("chain-run", network, &task_spec()).unwrap();
    let report = scheduler.execute("chain-run").unwrap();
    assert_eq!(report.state, TaskState::Finished);

    let frames = seen.lock().unwrap();
    let values: Vec<f64> = frames.iter().map(|f| f.get("x").unwrap()).collect();
    // The gain stage publishes zeros on its first cycle, then the scaled
    // input one cycle behind.
    assert_eq!(values, vec![0.0, 6.0, 6.0, 6.0, 6.0]);
}

#[test]
fn provide_port_fans_out_to_two_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut registry = ModuleRegistry::new();
    registry
        .register("source", ConstantSource::factory(vec![("x".to_string(), 1.5)]))
        .unwrap();
    registry
        .register("sink", Collector::factory(Arc::clone(&seen)))
        .unwrap();

    let network = Network::build(
        "fan",
        &ConnectivitySpec {
            edges: vec![
                edge("source_1", "outflow", "sink_1", "inflow"),
                edge("source_1", "outflow", "sink_2", "inflow"),
            ],
        },
    )
    .unwrap();

    let mut scheduler = Scheduler::new(registry).with_config(fast_config(dir.path()));
    scheduler.add_task("fan-run", network, &task_spec()).unwrap();
    let report = scheduler.execute("fan-run").unwrap();

    assert_eq!(report.state, TaskState::Finished);
    // Both sinks observe all five cycles.
    assert_eq!(seen.lock().unwrap().len(), 10);
}

struct FailAt {
    time: u64,
    ports: coupler::PortSet,
}

impl ModuleDriver for FailAt {
    fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
        for port in self.ports.iter_mut() {
            port.receive(time)?;
        }
        Ok(())
    }

    fn execute(&mut self, time: u64, _step: u64) -> CouplingResult<()> {
        if time >= self.time {
            return Err(CouplingError::Configuration("deliberate failure".to_string()));
        }
        Ok(())
    }
}

#[test]
fn failing_slot_marks_task_failed() {
    let dir = tempfile::tempdir().unwrap();

    let mut registry = ModuleRegistry::new();
    registry
        .register("source", ConstantSource::factory(vec![("x".to_string(), 1.0)]))
        .unwrap();
    registry
        .register("bad", |ctx| {
            Ok(Box::new(FailAt {
                time: 50,
                ports: ctx.ports,
            }) as Box<dyn ModuleDriver>)
        })
        .unwrap();

    let network = Network::build(
        "failing",
        &ConnectivitySpec {
            edges: vec![edge("source_1", "outflow", "bad_1", "inflow")],
        },
    )
    .unwrap();

    let mut scheduler = Scheduler::new(registry).with_config(fast_config(dir.path()));
    scheduler.add_task("failing-run", network, &task_spec()).unwrap();
    let report = scheduler.execute("failing-run").unwrap();

    assert_eq!(report.state, TaskState::Failed);
    assert!(report.error.is_some());
    let bad = SlotId::new("bad", "1");
    let bad_status = report
        .statuses
        .iter()
        .find(|(slot, _)| *slot == bad)
        .map(|(_, s)| *s);
    assert_eq!(bad_status, Some(SlotStatus::Failed));
}

#[test]
fn file_status_store_backs_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let status_dir = dir.path().join("status");
    let store: Arc<dyn StatusStore> =
        Arc::new(FileStatusStore::new(status_dir.clone()).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut registry = ModuleRegistry::new();
    registry
        .register("source", ConstantSource::factory(vec![("x".to_string(), 2.0)]))
        .unwrap();
    registry
        .register("sink", Collector::factory(Arc::clone(&seen)))
        .unwrap();

    let network = Network::build(
        "pair",
        &ConnectivitySpec {
            edges: vec![edge("source_1", "outflow", "sink_1", "inflow")],
        },
    )
    .unwrap();

    let mut scheduler = Scheduler::new(registry)
        .with_status_store(Arc::clone(&store))
        .with_config(fast_config(dir.path()));
    scheduler.add_task("pair-run", network, &task_spec()).unwrap();
    let report = scheduler.execute("pair-run").unwrap();

    assert_eq!(report.state, TaskState::Finished);
    // The status documents survive the run on disk.
    assert!(status_dir.join("source_1.status").exists());
    assert_eq!(
        store.read(&SlotId::new("sink", "1")).unwrap(),
        Some(SlotStatus::Finished)
    );
}

#[test]
fn file_transport_couples_ports_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outflow.port");

    let mut out = Port::new(SlotId::new("source", "1"), "outflow", PortDirection::Provide);
    let header = DocumentHeader::scalars("outflow", TimeUnit::Min, vec!["x".to_string()]);
    out.attach(Box::new(FileWriter::new(
        path.clone(),
        header,
        Endpoint::new(SlotId::new("source", "1"), "outflow"),
    )))
    .unwrap();

    let mut inp = Port::new(SlotId::new("sink", "1"), "inflow", PortDirection::Use);
    let policy = RetryPolicy {
        interval: Duration::from_millis(10),
        warn_after: 5,
        max_trials: 100,
    };
    inp.attach(Box::new(FileReader::new(
        path,
        Endpoint::new(SlotId::new("sink", "1"), "inflow"),
        policy,
    )))
    .unwrap();

    let writer = std::thread::spawn(move || {
        for t in [0u64, 25, 50] {
            out.send(&Frame::scalar(t, "x", t as f64 / 10.0)).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
    });

    for t in [0u64, 25, 50] {
        let frame = inp.receive(t).unwrap();
        assert_eq!(frame.get("x"), Some(t as f64 / 10.0));
    }
    writer.join().unwrap();
}

#[test]
fn invalid_topology_never_reaches_the_scheduler() {
    let err = Network::build(
        "bad",
        &ConnectivitySpec {
            edges: vec![
                edge("source_1", "outflow", "sink_1", "inflow"),
                edge("source_2", "outflow", "sink_1", "inflow"),
            ],
        },
    )
    .unwrap_err();
    assert!(matches!(err, CouplingError::InvalidTopology { .. }));
}

#[test]
fn unused_link_options_defaults_are_sane() {
    let opts = LinkOptions::default();
    assert!(opts.capacity > 0);
    assert!(opts.recv_timeout > Duration::ZERO);
}
