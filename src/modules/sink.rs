//! A sink collecting every received frame.

use std::sync::{Arc, Mutex};

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::frame::Frame;
use crate::core::port::PortSet;
use crate::core::registry::{ModuleContext, ModuleDriver};

/// Receives on every use port each cycle and appends the frames to a shared
/// buffer, so a test or caller can inspect what actually flowed.
pub struct Collector {
    ports: PortSet,
    buffer: Arc<Mutex<Vec<Frame>>>,
}

impl Collector {
    pub fn new(ports: PortSet, buffer: Arc<Mutex<Vec<Frame>>>) -> Self {
        Self { ports, buffer }
    }

    /// Registry factory sharing one buffer across all instances.
    pub fn factory(
        buffer: Arc<Mutex<Vec<Frame>>>,
    ) -> impl Fn(ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> + Send + Sync + 'static
    {
        move |ctx| {
            Ok(Box::new(Collector::new(ctx.ports, Arc::clone(&buffer))) as Box<dyn ModuleDriver>)
        }
    }
}

impl ModuleDriver for Collector {
    fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
        let mut received = Vec::with_capacity(self.ports.len());
        for port in self.ports.iter_mut() {
            received.push(port.receive(time)?);
        }
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| CouplingError::Configuration("collector buffer lock poisoned".to_string()))?;
        buffer.extend(received);
        Ok(())
    }

    fn execute(&mut self, _time: u64, _step: u64) -> CouplingResult<()> {
        Ok(())
    }
}
