//! Simulated-time handling.
//!
//! All time values are normalized to a single base unit (minutes) when a
//! task specification is parsed; the advancement loop only ever sees
//! normalized values.

use serde::{Deserialize, Serialize};

use super::error::{CouplingError, CouplingResult};

/// Accepted time units for task window specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Min,
    Hour,
    Day,
}

impl TimeUnit {
    /// Conversion factor to the base unit (minutes).
    pub fn minutes(&self) -> u64 {
        match self {
            TimeUnit::Min => 1,
            TimeUnit::Hour => 60,
            TimeUnit::Day => 1440,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeUnit::Min => "min",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        }
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = CouplingError;

    fn from_str(s: &str) -> CouplingResult<Self> {
        match s.trim() {
            "min" => Ok(TimeUnit::Min),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            other => Err(CouplingError::Configuration(format!(
                "unknown time unit '{}', expected min, hour or day",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One task's time window, normalized to minutes.
///
/// The advancement loop is boundary inclusive: a slot executes a cycle at
/// every `t` with `start <= t <= evolve`, stepping by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u64,
    pub evolve: u64,
    pub step: u64,
}

impl TimeWindow {
    /// Create a window from already-normalized values.
    pub fn new(start: u64, evolve: u64, step: u64) -> CouplingResult<Self> {
        if step == 0 {
            return Err(CouplingError::Configuration(
                "time step must be greater than zero".to_string(),
            ));
        }
        if evolve < start {
            return Err(CouplingError::Configuration(format!(
                "evolve time {} precedes start time {}",
                evolve, start
            )));
        }
        Ok(Self {
            start,
            evolve,
            step,
        })
    }

    /// Create a window from raw values in the given unit, normalizing to
    /// minutes.
    pub fn normalized(start: u64, evolve: u64, step: u64, unit: TimeUnit) -> CouplingResult<Self> {
        let f = unit.minutes();
        Self::new(start * f, evolve * f, step * f)
    }

    /// Iterate the cycle times of the advancement loop, boundary inclusive.
    pub fn cycles(&self) -> Cycles {
        Cycles {
            next: self.start,
            evolve: self.evolve,
            step: self.step,
            done: false,
        }
    }

    /// Number of cycles the advancement loop executes.
    pub fn cycle_count(&self) -> u64 {
        (self.evolve - self.start) / self.step + 1
    }
}

/// Iterator over the cycle times of a [`TimeWindow`].
pub struct Cycles {
    next: u64,
    evolve: u64,
    step: u64,
    done: bool,
}

impl Iterator for Cycles {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.done || self.next > self.evolve {
            return None;
        }
        let t = self.next;
        match self.next.checked_add(self.step) {
            Some(n) => self.next = n,
            None => self.done = true,
        }
        Some(t)
    }
}
