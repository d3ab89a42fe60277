//! External configuration schemas.
//!
//! Connectivity and task-window specifications are deserialized from JSON.
//! Attribute names are kebab-case and time values carry an explicit unit.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::time::{TimeUnit, TimeWindow};

/// One directed port-to-port connection entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    #[serde(rename = "from-module-slot")]
    pub from_module_slot: String,
    #[serde(rename = "to-module-slot")]
    pub to_module_slot: String,
    #[serde(rename = "from-port")]
    pub from_port: String,
    #[serde(rename = "to-port")]
    pub to_port: String,
}

/// The full connectivity specification a network is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySpec {
    pub edges: Vec<EdgeSpec>,
}

impl ConnectivitySpec {
    pub fn from_json_str(text: &str) -> CouplingResult<Self> {
        serde_json::from_str(text).map_err(|e| {
            CouplingError::Configuration(format!("invalid connectivity spec: {e}"))
        })
    }

    pub fn from_json_file(path: &Path) -> CouplingResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// The time window of one simulation task, in the unit it was written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(rename = "start-time")]
    pub start_time: u64,
    #[serde(rename = "evolve-time")]
    pub evolve_time: u64,
    #[serde(rename = "time-step")]
    pub time_step: u64,
    #[serde(rename = "time-unit")]
    pub time_unit: TimeUnit,
}

impl TaskSpec {
    /// Normalize to base minutes and validate the window.
    pub fn window(&self) -> CouplingResult<TimeWindow> {
        TimeWindow::normalized(self.start_time, self.evolve_time, self.time_step, self.time_unit)
    }

    pub fn from_json_str(text: &str) -> CouplingResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| CouplingError::Configuration(format!("invalid task spec: {e}")))
    }

    pub fn from_json_file(path: &Path) -> CouplingResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
