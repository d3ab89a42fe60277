//! Degraded-mode file-backed port transport.
//!
//! Used when the two endpoints of a port live in different processes and
//! share only a filesystem. The write side creates the port document on its
//! first send and appends one time-tagged record per step. The read side
//! polls for the document and the requested record, warning past a trial
//! threshold and failing with a typed timeout once the bound is exhausted.
//!
//! Delivery is eventually consistent, bounded only by the polling interval;
//! a writer crash shows up at the reader as a timeout rather than an
//! explicit failure.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};

use super::document::{DocumentHeader, PortDocument};
use super::{Endpoint, Transport};
use crate::core::error::{CouplingError, CouplingResult};
use crate::core::frame::Frame;

/// Bounded poll-retry policy for the read side.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Sleep between polls.
    pub interval: Duration,
    /// Log a warning once this many trials have gone by.
    pub warn_after: u32,
    /// Fail with a timeout once this many trials have gone by.
    pub max_trials: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            warn_after: 10,
            max_trials: 50,
        }
    }
}

/// Write side of a file-backed provide-port.
pub struct FileWriter {
    path: PathBuf,
    header: DocumentHeader,
    local: Endpoint,
    initialized: bool,
}

impl FileWriter {
    pub fn new(path: PathBuf, header: DocumentHeader, local: Endpoint) -> Self {
        let initialized = path.exists();
        Self {
            path,
            header,
            local,
            initialized,
        }
    }
}

impl Transport for FileWriter {
    fn send(&mut self, frame: &Frame) -> CouplingResult<()> {
        let record = PortDocument::render_record(&self.header, frame)?;
        if !self.initialized {
            let mut text = self.header.render();
            text.push_str(&record);
            std::fs::write(&self.path, text)?;
            self.initialized = true;
            debug!("{}: created port document {}", self.local, self.path.display());
        } else {
            let mut file = OpenOptions::new().append(true).open(&self.path)?;
            file.write_all(record.as_bytes())?;
        }
        Ok(())
    }

    fn recv(&mut self, _time: u64) -> CouplingResult<Frame> {
        Err(CouplingError::Configuration(format!(
            "{}: file-backed provide-ports cannot receive",
            self.local
        )))
    }
}

/// Read side of a file-backed use-port.
pub struct FileReader {
    path: PathBuf,
    local: Endpoint,
    policy: RetryPolicy,
}

impl FileReader {
    pub fn new(path: PathBuf, local: Endpoint, policy: RetryPolicy) -> Self {
        Self {
            path,
            local,
            policy,
        }
    }
}

impl Transport for FileReader {
    fn send(&mut self, _frame: &Frame) -> CouplingResult<()> {
        Err(CouplingError::Configuration(format!(
            "{}: file-backed use-ports cannot send",
            self.local
        )))
    }

    fn recv(&mut self, time: u64) -> CouplingResult<Frame> {
        let mut trials = 0u32;
        loop {
            // An absent or still-unparsable document means the writer has
            // not caught up yet; keep polling.
            if let Ok(doc) = PortDocument::load(&self.path) {
                if let Some(record) = doc.record_at(time) {
                    return Ok(record.clone());
                }
            }
            trials += 1;
            if trials == self.policy.warn_after {
                warn!(
                    "{}: still waiting for record t={} in {} after {} trials",
                    self.local,
                    time,
                    self.path.display(),
                    trials
                );
            }
            if trials >= self.policy.max_trials {
                return Err(CouplingError::Timeout {
                    slot: self.local.slot.clone(),
                    port: self.local.port.clone(),
                    time,
                });
            }
            std::thread::sleep(self.policy.interval);
        }
    }
}
