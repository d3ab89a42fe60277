//! Module driver contract and the slot registry.
//!
//! A driver is an opaque unit implementing the two coupling operations.
//! The registry maps a module-type name to a factory that builds a driver
//! from its bound context; slot resolution happens by module type, so one
//! factory serves every instance of that type.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::port::PortSet;
use crate::core::time::TimeWindow;
use crate::core::types::SlotId;

/// One runnable module instance.
///
/// The coupling contract: `call_ports` exchanges exactly the data needed for
/// the next `execute` call, and is invoked before `execute` every cycle. A
/// driver must not advance state on port data staler than the current step,
/// and must not publish provide-port data for a step before completing the
/// corresponding `execute`.
pub trait ModuleDriver: Send {
    /// Exchange data over the bound ports for cycle time `time`.
    fn call_ports(&mut self, time: u64) -> CouplingResult<()>;

    /// Advance local state from `time` by `step`.
    fn execute(&mut self, time: u64, step: u64) -> CouplingResult<()>;
}

/// Everything a driver receives at construction.
pub struct ModuleContext {
    /// Identity of the slot the driver is bound to.
    pub slot: SlotId,
    /// Optional input descriptor (model file, feed manifest).
    pub input: Option<PathBuf>,
    /// Scratch directory private to the slot.
    pub work_dir: PathBuf,
    /// The slot's bound ports, connected before launch.
    pub ports: PortSet,
    /// The task's normalized time window.
    pub window: TimeWindow,
}

/// Boxed constructor building a driver from its bound context.
pub type DriverFactory =
    Box<dyn Fn(ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> + Send + Sync>;

/// Maps module-type names to driver factories.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a module type.
    pub fn register<F>(&mut self, module_type: &str, factory: F) -> CouplingResult<()>
    where
        F: Fn(ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(module_type) {
            return Err(CouplingError::Configuration(format!(
                "module type '{}' is already registered",
                module_type
            )));
        }
        self.factories.insert(module_type.to_string(), Box::new(factory));
        Ok(())
    }

    /// Look up the factory serving a slot's module type.
    pub fn resolve(&self, slot: &SlotId) -> CouplingResult<&DriverFactory> {
        self.factories
            .get(slot.module_type())
            .ok_or_else(|| CouplingError::ModuleNotFound(slot.module_type().to_string()))
    }

    /// Build a driver instance for `slot` from its bound context.
    pub fn instantiate(&self, ctx: ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> {
        let factory = self.resolve(&ctx.slot)?;
        factory(ctx)
    }

    pub fn is_registered(&self, module_type: &str) -> bool {
        self.factories.contains_key(module_type)
    }
}
