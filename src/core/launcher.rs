//! Slot launching and the per-slot advancement loop.
//!
//! Each slot runs on its own thread and self-drives the coupling loop once
//! launched: ports are exchanged, then local state advances, every cycle
//! until the evolve time is passed. The slot writes its status around the
//! loop; an error inside a cycle marks the slot failed without taking the
//! task's process down.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::registry::{ModuleContext, ModuleDriver, ModuleRegistry};
use crate::core::status::{SlotStatus, StatusStore};
use crate::core::time::TimeWindow;
use crate::core::types::SlotId;

/// Handle to one launched slot.
pub struct SlotHandle {
    slot: SlotId,
    join: JoinHandle<CouplingResult<()>>,
}

impl SlotHandle {
    pub fn slot(&self) -> &SlotId {
        &self.slot
    }

    /// Whether the slot's thread has exited, without joining it.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the slot's thread to finish and surface its result.
    pub fn join(self) -> CouplingResult<()> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(CouplingError::SlotFailed {
                slot: self.slot,
                reason: "slot thread panicked".to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotHandle")
            .field("slot", &self.slot)
            .field("finished", &self.join.is_finished())
            .finish()
    }
}

/// Starts module drivers as independent units of concurrency.
pub struct Launcher {
    registry: Arc<ModuleRegistry>,
    status: Arc<dyn StatusStore>,
    work_dir: PathBuf,
}

impl Launcher {
    pub fn new(registry: Arc<ModuleRegistry>, status: Arc<dyn StatusStore>, work_dir: PathBuf) -> Self {
        Self {
            registry,
            status,
            work_dir,
        }
    }

    /// Instantiate the driver for `ctx.slot` and start its advancement loop
    /// on a dedicated thread.
    ///
    /// Driver construction happens on the calling thread, so an unresolvable
    /// module type or a failing constructor surfaces before anything runs.
    pub fn launch(&self, mut ctx: ModuleContext) -> CouplingResult<SlotHandle> {
        let slot = ctx.slot.clone();
        if ctx.work_dir.as_os_str().is_empty() {
            ctx.work_dir = self.work_dir.join(slot.key());
        }
        std::fs::create_dir_all(&ctx.work_dir)?;

        let window = ctx.window;
        let driver = self.registry.instantiate(ctx)?;
        let status = Arc::clone(&self.status);

        let thread_slot = slot.clone();
        let join = thread::Builder::new()
            .name(slot.key())
            .spawn(move || run_slot(thread_slot, driver, window, status))
            .map_err(|e| CouplingError::Configuration(format!(
                "failed to spawn thread for slot '{}': {}",
                slot, e
            )))?;

        Ok(SlotHandle { slot, join })
    }
}

/// The advancement loop one slot executes.
fn run_slot(
    slot: SlotId,
    mut driver: Box<dyn ModuleDriver>,
    window: TimeWindow,
    status: Arc<dyn StatusStore>,
) -> CouplingResult<()> {
    status.write(&slot, SlotStatus::Running)?;
    info!("slot '{}' running over {:?}", slot, window);

    for t in window.cycles() {
        // Ports before execute, every cycle.
        let cycle = driver
            .call_ports(t)
            .and_then(|_| driver.execute(t, window.step));
        if let Err(e) = cycle {
            error!("slot '{}' failed at t={}: {}", slot, t, e);
            status.write(&slot, SlotStatus::Failed)?;
            return Err(CouplingError::SlotFailed {
                slot,
                reason: e.to_string(),
            });
        }
        debug!("slot '{}' completed cycle t={}", slot, t);
    }

    status.write(&slot, SlotStatus::Finished)?;
    info!("slot '{}' finished", slot);
    Ok(())
}
