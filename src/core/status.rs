//! Per-slot status records and the runtime monitor.
//!
//! Each slot persists its status through a [`StatusStore`]; the monitor
//! polls every slot of a task and aggregates. Transitions are monotonic,
//! `not-started -> running -> finished | failed`, and a regression is a
//! typed error. A record the monitor cannot read yet counts as running;
//! completion is never inferred from absence.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::transport::document::{parse_status, render_status};
use crate::core::types::SlotId;

/// The state machine value a slot persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    NotStarted,
    Running,
    Finished,
    Failed,
}

impl SlotStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SlotStatus::NotStarted => "not-started",
            SlotStatus::Running => "running",
            SlotStatus::Finished => "finished",
            SlotStatus::Failed => "failed",
        }
    }

    pub fn from_label(label: &str) -> CouplingResult<Self> {
        match label {
            "not-started" => Ok(SlotStatus::NotStarted),
            "running" => Ok(SlotStatus::Running),
            "finished" => Ok(SlotStatus::Finished),
            "failed" => Ok(SlotStatus::Failed),
            other => Err(CouplingError::Configuration(format!(
                "unknown slot status '{}'",
                other
            ))),
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Re-writing the current state is allowed; the terminal states are
    /// frozen.
    pub fn can_transition(&self, next: SlotStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            SlotStatus::NotStarted => true,
            SlotStatus::Running => matches!(next, SlotStatus::Finished | SlotStatus::Failed),
            SlotStatus::Finished | SlotStatus::Failed => false,
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where slots persist status records and the monitor reads them back.
pub trait StatusStore: Send + Sync {
    /// Persist `status` for `slot`, enforcing monotonic transitions.
    fn write(&self, slot: &SlotId, status: SlotStatus) -> CouplingResult<()>;

    /// Read the last persisted status, `None` when nothing was written yet.
    fn read(&self, slot: &SlotId) -> CouplingResult<Option<SlotStatus>>;
}

/// Shared-map store for slots coupled within one process.
#[derive(Default)]
pub struct InMemoryStatusStore {
    records: Mutex<HashMap<String, SlotStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn write(&self, slot: &SlotId, status: SlotStatus) -> CouplingResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| CouplingError::Configuration("status store lock poisoned".to_string()))?;
        let current = records.get(&slot.key()).copied();
        if let Some(current) = current {
            if !current.can_transition(status) {
                return Err(CouplingError::StatusRegression {
                    slot: slot.clone(),
                    from: current.label(),
                    to: status.label(),
                });
            }
        }
        records.insert(slot.key(), status);
        Ok(())
    }

    fn read(&self, slot: &SlotId) -> CouplingResult<Option<SlotStatus>> {
        let records = self
            .records
            .lock()
            .map_err(|_| CouplingError::Configuration("status store lock poisoned".to_string()))?;
        Ok(records.get(&slot.key()).copied())
    }
}

/// File-per-slot store for cross-process coupling.
///
/// Each slot writes `<dir>/<slot-key>.status` as a one-field status
/// document.
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: PathBuf) -> CouplingResult<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, slot: &SlotId) -> PathBuf {
        self.dir.join(format!("{}.status", slot.key()))
    }

    fn read_current(&self, slot: &SlotId) -> CouplingResult<Option<SlotStatus>> {
        let path = self.path_for(slot);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let label = parse_status(&text, &path.display().to_string())?;
        Ok(Some(SlotStatus::from_label(&label)?))
    }
}

impl StatusStore for FileStatusStore {
    fn write(&self, slot: &SlotId, status: SlotStatus) -> CouplingResult<()> {
        if let Some(current) = self.read_current(slot)? {
            if !current.can_transition(status) {
                return Err(CouplingError::StatusRegression {
                    slot: slot.clone(),
                    from: current.label(),
                    to: status.label(),
                });
            }
        }
        std::fs::write(self.path_for(slot), render_status(status.label()))?;
        Ok(())
    }

    fn read(&self, slot: &SlotId) -> CouplingResult<Option<SlotStatus>> {
        self.read_current(slot)
    }
}

/// Task-level aggregate of every slot's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateStatus {
    Running,
    Finished,
    Failed,
}

/// Polls the slots of one task and aggregates their status.
pub struct StatusMonitor {
    store: Arc<dyn StatusStore>,
    slots: Vec<SlotId>,
}

impl StatusMonitor {
    pub fn new(store: Arc<dyn StatusStore>, slots: Vec<SlotId>) -> Self {
        Self { store, slots }
    }

    /// Read every slot's current status.
    ///
    /// A record that is missing or cannot yet be read is reported as
    /// running and retried on the next poll.
    pub fn poll(&self) -> Vec<(SlotId, SlotStatus)> {
        self.slots
            .iter()
            .map(|slot| {
                let status = match self.store.read(slot) {
                    Ok(Some(status)) => status,
                    Ok(None) => SlotStatus::Running,
                    Err(e) => {
                        debug!("status of slot '{}' unreadable, assuming running: {}", slot, e);
                        SlotStatus::Running
                    }
                };
                (slot.clone(), status)
            })
            .collect()
    }

    /// Aggregate one poll into a task-level status.
    pub fn aggregate(&self) -> (AggregateStatus, Vec<(SlotId, SlotStatus)>) {
        let statuses = self.poll();
        let aggregate = if statuses.iter().any(|(_, s)| *s == SlotStatus::Failed) {
            AggregateStatus::Failed
        } else if statuses.iter().all(|(_, s)| *s == SlotStatus::Finished) {
            AggregateStatus::Finished
        } else {
            AggregateStatus::Running
        };
        (aggregate, statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(key: &str) -> SlotId {
        SlotId::parse(key).unwrap()
    }

    #[test]
    fn test_transition_rules() {
        assert!(SlotStatus::NotStarted.can_transition(SlotStatus::Running));
        assert!(SlotStatus::Running.can_transition(SlotStatus::Finished));
        assert!(SlotStatus::Running.can_transition(SlotStatus::Failed));
        assert!(SlotStatus::Running.can_transition(SlotStatus::Running));
        assert!(!SlotStatus::Finished.can_transition(SlotStatus::Running));
        assert!(!SlotStatus::Failed.can_transition(SlotStatus::Finished));
    }

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemoryStatusStore::new();
        let s = slot("storage_1");
        assert_eq!(store.read(&s).unwrap(), None);
        store.write(&s, SlotStatus::Running).unwrap();
        assert_eq!(store.read(&s).unwrap(), Some(SlotStatus::Running));
    }

    #[test]
    fn test_in_memory_store_rejects_regression() {
        let store = InMemoryStatusStore::new();
        let s = slot("storage_1");
        store.write(&s, SlotStatus::Finished).unwrap();
        let err = store.write(&s, SlotStatus::Running).unwrap_err();
        assert!(matches!(err, CouplingError::StatusRegression { .. }));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().to_path_buf()).unwrap();
        let s = slot("chopper_1");
        store.write(&s, SlotStatus::Running).unwrap();
        store.write(&s, SlotStatus::Finished).unwrap();
        assert_eq!(store.read(&s).unwrap(), Some(SlotStatus::Finished));
        assert!(store.write(&s, SlotStatus::Running).is_err());
    }

    #[test]
    fn test_monitor_treats_missing_as_running() {
        let store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
        let slots = vec![slot("storage_1"), slot("chopper_1")];
        store.write(&slots[0], SlotStatus::Finished).unwrap();

        let monitor = StatusMonitor::new(store, slots);
        let (aggregate, statuses) = monitor.aggregate();
        assert_eq!(aggregate, AggregateStatus::Running);
        assert_eq!(statuses[1].1, SlotStatus::Running);
    }

    #[test]
    fn test_monitor_finished_only_when_all_finished() {
        let store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
        let slots = vec![slot("storage_1"), slot("chopper_1")];
        for s in &slots {
            store.write(s, SlotStatus::Finished).unwrap();
        }
        let monitor = StatusMonitor::new(store, slots);
        assert_eq!(monitor.aggregate().0, AggregateStatus::Finished);
    }

    #[test]
    fn test_monitor_failure_dominates() {
        let store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
        let slots = vec![slot("storage_1"), slot("chopper_1")];
        store.write(&slots[0], SlotStatus::Finished).unwrap();
        store.write(&slots[1], SlotStatus::Failed).unwrap();
        let monitor = StatusMonitor::new(store, slots);
        assert_eq!(monitor.aggregate().0, AggregateStatus::Failed);
    }
}
