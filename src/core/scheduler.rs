//! Task scheduling and the synchronized execution protocol.
//!
//! A scheduler owns named tasks (a network plus a time window), wires one
//! in-process link per topology edge, launches every slot, and then only
//! observes: the monitor is polled until the aggregate status reaches a
//! terminal state, with a warning once a run exceeds the stall threshold.
//! Slots self-drive their advancement loops; the scheduler never steps them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use uuid::Uuid;

use crate::core::config::TaskSpec;
use crate::core::error::{CouplingError, CouplingResult};
use crate::core::launcher::{Launcher, SlotHandle};
use crate::core::network::Network;
use crate::core::port::{LinkOptions, Port, PortDirection, PortSet};
use crate::core::registry::{ModuleContext, ModuleRegistry};
use crate::core::status::{
    AggregateStatus, InMemoryStatusStore, SlotStatus, StatusMonitor, StatusStore,
};
use crate::core::time::TimeWindow;
use crate::core::types::SlotId;

/// Lifecycle of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Initialized,
    Running,
    Finished,
    Failed,
}

/// Tunables shared by every task a scheduler runs.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Monitor polling interval.
    pub poll_interval: Duration,
    /// Bounded queue capacity per port link direction.
    pub port_capacity: usize,
    /// Port receive timeout before a typed error.
    pub recv_timeout: Duration,
    /// Log a warning once a run has been going this long.
    pub stall_warning: Duration,
    /// Root directory for per-run slot scratch space.
    pub work_dir: PathBuf,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            port_capacity: 16,
            recv_timeout: Duration::from_secs(30),
            stall_warning: Duration::from_secs(60),
            work_dir: std::env::temp_dir().join("coupler"),
        }
    }
}

impl TaskConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_port_capacity(mut self, capacity: usize) -> Self {
        self.port_capacity = capacity;
        self
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn with_stall_warning(mut self, threshold: Duration) -> Self {
        self.stall_warning = threshold;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.work_dir = dir;
        self
    }
}

/// Outcome of one task execution.
#[derive(Debug)]
pub struct TaskReport {
    pub name: String,
    pub run_id: Uuid,
    pub state: TaskState,
    pub statuses: Vec<(SlotId, SlotStatus)>,
    pub error: Option<CouplingError>,
}

/// Drives simulation tasks over registered networks.
pub struct Scheduler {
    tasks: HashMap<String, (Network, TimeWindow)>,
    registry: Arc<ModuleRegistry>,
    status: Arc<dyn StatusStore>,
    config: TaskConfig,
}

impl Scheduler {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            tasks: HashMap::new(),
            registry: Arc::new(registry),
            status: Arc::new(InMemoryStatusStore::new()),
            config: TaskConfig::default(),
        }
    }

    /// Replace the default in-memory status store.
    pub fn with_status_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.status = store;
        self
    }

    pub fn with_config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a task: a validated network plus its time window.
    pub fn add_task(&mut self, name: &str, network: Network, spec: &TaskSpec) -> CouplingResult<()> {
        if self.tasks.contains_key(name) {
            return Err(CouplingError::Configuration(format!(
                "task '{}' is already registered",
                name
            )));
        }
        let window = spec.window()?;
        self.tasks.insert(name.to_string(), (network, window));
        Ok(())
    }

    /// Execute one task to completion and report the outcome.
    pub fn execute(&self, task_name: &str) -> CouplingResult<TaskReport> {
        let (network, window) = self
            .tasks
            .get(task_name)
            .ok_or_else(|| CouplingError::TaskNotFound(task_name.to_string()))?;

        // Every module type must resolve before anything starts; a task
        // never partially launches.
        for slot in network.slot_names() {
            self.registry.resolve(slot)?;
        }

        let run_id = Uuid::new_v4();
        let work_root = self.config.work_dir.join(run_id.to_string());
        info!(
            "task '{}' run {} starting: {} slots, {} edges, window {:?}",
            task_name,
            run_id,
            network.slot_names().len(),
            network.edges().len(),
            window
        );

        let mut port_sets = self.wire_ports(network)?;
        let launcher = Launcher::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.status),
            work_root,
        );

        let mut handles: Vec<SlotHandle> = Vec::with_capacity(network.slot_names().len());
        for slot in network.slot_names() {
            let ports = port_sets.remove(&slot.key()).unwrap_or_default();
            let ctx = ModuleContext {
                slot: slot.clone(),
                input: None,
                work_dir: PathBuf::new(),
                ports: PortSet::new(ports)?,
                window: *window,
            };
            handles.push(launcher.launch(ctx)?);
        }

        let monitor = StatusMonitor::new(Arc::clone(&self.status), network.slot_names().to_vec());
        self.monitor_until_terminal(task_name, &monitor, &handles);

        let mut first_error: Option<CouplingError> = None;
        for handle in handles {
            if let Err(e) = handle.join() {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        let (aggregate, statuses) = monitor.aggregate();
        let state = match (aggregate, &first_error) {
            (AggregateStatus::Finished, None) => TaskState::Finished,
            _ => TaskState::Failed,
        };
        info!("task '{}' run {} ended as {:?}", task_name, run_id, state);

        Ok(TaskReport {
            name: task_name.to_string(),
            run_id,
            state,
            statuses,
            error: first_error,
        })
    }

    fn monitor_until_terminal(&self, task_name: &str, monitor: &StatusMonitor, handles: &[SlotHandle]) {
        let started = Instant::now();
        let mut stall_reported = false;
        loop {
            let (aggregate, statuses) = monitor.aggregate();
            if aggregate != AggregateStatus::Running {
                return;
            }
            // A slot that died without reaching a terminal status would
            // otherwise keep the aggregate running forever.
            if handles.iter().all(|h| h.is_finished()) {
                return;
            }
            if !stall_reported && started.elapsed() >= self.config.stall_warning {
                let pending: Vec<String> = statuses
                    .iter()
                    .filter(|(_, s)| *s != SlotStatus::Finished)
                    .map(|(slot, s)| format!("{}={}", slot, s))
                    .collect();
                warn!(
                    "task '{}' still running after {:?}: {}",
                    task_name,
                    started.elapsed(),
                    pending.join(", ")
                );
                stall_reported = true;
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Create and connect one link per topology edge, grouped per slot.
    fn wire_ports(&self, network: &Network) -> CouplingResult<HashMap<String, Vec<Port>>> {
        let opts = LinkOptions {
            capacity: self.config.port_capacity,
            recv_timeout: self.config.recv_timeout,
        };

        let mut ports: Vec<Port> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        let mut ensure = |ports: &mut Vec<Port>,
                          slot: &SlotId,
                          name: &str,
                          direction: PortDirection|
         -> CouplingResult<usize> {
            let key = (slot.key(), name.to_string());
            if let Some(&i) = index.get(&key) {
                if ports[i].direction() != direction {
                    return Err(CouplingError::Configuration(format!(
                        "port '{}' on slot '{}' wired in both directions",
                        name, slot
                    )));
                }
                return Ok(i);
            }
            ports.push(Port::new(slot.clone(), name, direction));
            index.insert(key, ports.len() - 1);
            Ok(ports.len() - 1)
        };

        for edge in network.edges() {
            let from = ensure(&mut ports, &edge.from, &edge.from_port, PortDirection::Provide)?;
            let to = ensure(&mut ports, &edge.to, &edge.to_port, PortDirection::Use)?;
            let (provide, consume) = pair_mut(&mut ports, from, to)?;
            provide.connect(consume, &opts)?;
        }

        let mut grouped: HashMap<String, Vec<Port>> = HashMap::new();
        for mut port in ports {
            port.finalize();
            grouped.entry(port.owner().key()).or_default().push(port);
        }
        Ok(grouped)
    }
}

/// Borrow two distinct elements of `ports` mutably.
fn pair_mut(ports: &mut [Port], i: usize, j: usize) -> CouplingResult<(&mut Port, &mut Port)> {
    if i == j {
        return Err(CouplingError::Configuration(
            "cannot connect a port to itself".to_string(),
        ));
    }
    if i < j {
        let (head, tail) = ports.split_at_mut(j);
        Ok((&mut head[i], &mut tail[0]))
    } else {
        let (head, tail) = ports.split_at_mut(i);
        Ok((&mut tail[0], &mut head[j]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ConnectivitySpec, EdgeSpec};
    use crate::core::frame::Frame;
    use crate::core::registry::ModuleDriver;
    use crate::core::time::TimeUnit;
    use std::sync::Mutex;

    struct Publisher {
        ports: PortSet,
        value: f64,
    }

    impl ModuleDriver for Publisher {
        fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
            self.ports
                .get_mut("out")?
                .send(&Frame::scalar(time, "x", self.value))
        }

        fn execute(&mut self, _time: u64, _step: u64) -> CouplingResult<()> {
            Ok(())
        }
    }

    struct Subscriber {
        ports: PortSet,
        seen: Arc<Mutex<Vec<Frame>>>,
    }

    impl ModuleDriver for Subscriber {
        fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
            let frame = self.ports.get_mut("in")?.receive(time)?;
            self.seen.lock().unwrap().push(frame);
            Ok(())
        }

        fn execute(&mut self, _time: u64, _step: u64) -> CouplingResult<()> {
            Ok(())
        }
    }

    fn edge(from: &str, from_port: &str, to: &str, to_port: &str) -> EdgeSpec {
        EdgeSpec {
            from_module_slot: from.to_string(),
            to_module_slot: to.to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
        }
    }

    fn spec() -> TaskSpec {
        TaskSpec {
            start_time: 0,
            evolve_time: 100,
            time_step: 25,
            time_unit: TimeUnit::Min,
        }
    }

    fn fast_config(dir: &std::path::Path) -> TaskConfig {
        TaskConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_recv_timeout(Duration::from_millis(200))
            .with_work_dir(dir.to_path_buf())
    }

    #[test]
    fn test_two_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut registry = ModuleRegistry::new();
        registry
            .register("pub", |ctx| {
                Ok(Box::new(Publisher {
                    ports: ctx.ports,
                    value: 3.0,
                }) as Box<dyn ModuleDriver>)
            })
            .unwrap();
        let seen_factory = Arc::clone(&seen);
        registry
            .register("sub", move |ctx| {
                Ok(Box::new(Subscriber {
                    ports: ctx.ports,
                    seen: Arc::clone(&seen_factory),
                }) as Box<dyn ModuleDriver>)
            })
            .unwrap();

        let network = Network::build(
            "pair",
            &ConnectivitySpec {
                edges: vec![edge("pub_1", "out", "sub_1", "in")],
            },
        )
        .unwrap();

        let mut scheduler = Scheduler::new(registry).with_config(fast_config(dir.path()));
        scheduler.add_task("pair-run", network, &spec()).unwrap();

        let report = scheduler.execute("pair-run").unwrap();
        assert_eq!(report.state, TaskState::Finished);
        assert!(report.error.is_none());
        assert!(report
            .statuses
            .iter()
            .all(|(_, s)| *s == SlotStatus::Finished));

        let frames = seen.lock().unwrap();
        let times: Vec<u64> = frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0, 25, 50, 75, 100]);
        assert!(frames.iter().all(|f| f.get("x") == Some(3.0)));
    }

    #[test]
    fn test_unknown_task_name() {
        let scheduler = Scheduler::new(ModuleRegistry::new());
        assert!(matches!(
            scheduler.execute("ghost"),
            Err(CouplingError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_unresolvable_module_prevents_partial_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModuleRegistry::new();
        registry
            .register("pub", |ctx| {
                Ok(Box::new(Publisher {
                    ports: ctx.ports,
                    value: 1.0,
                }) as Box<dyn ModuleDriver>)
            })
            .unwrap();

        let network = Network::build(
            "pair",
            &ConnectivitySpec {
                edges: vec![edge("pub_1", "out", "ghost_1", "in")],
            },
        )
        .unwrap();

        let mut scheduler = Scheduler::new(registry).with_config(fast_config(dir.path()));
        scheduler.add_task("pair-run", network, &spec()).unwrap();
        assert!(matches!(
            scheduler.execute("pair-run"),
            Err(CouplingError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_task_name_rejected() {
        let net = |name: &str| {
            Network::build(
                name,
                &ConnectivitySpec {
                    edges: vec![edge("pub_1", "out", "sub_1", "in")],
                },
            )
            .unwrap()
        };
        let mut scheduler = Scheduler::new(ModuleRegistry::new());
        scheduler.add_task("run", net("a"), &spec()).unwrap();
        assert!(scheduler.add_task("run", net("b"), &spec()).is_err());
    }

    #[test]
    fn test_pair_mut_rejects_equal_indices() {
        let mut ports = vec![Port::new(SlotId::new("a", "1"), "p", PortDirection::Use)];
        assert!(pair_mut(&mut ports, 0, 0).is_err());
    }
}
