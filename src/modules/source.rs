//! A source publishing fixed values every cycle.

use crate::core::error::CouplingResult;
use crate::core::frame::Frame;
use crate::core::port::PortSet;
use crate::core::registry::{ModuleContext, ModuleDriver};

/// Publishes the same named scalars on every provide port, each cycle.
pub struct ConstantSource {
    ports: PortSet,
    values: Vec<(String, f64)>,
}

impl ConstantSource {
    pub fn new(ports: PortSet, values: Vec<(String, f64)>) -> Self {
        Self { ports, values }
    }

    /// Registry factory fixing the published values.
    pub fn factory(
        values: Vec<(String, f64)>,
    ) -> impl Fn(ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> + Send + Sync + 'static
    {
        move |ctx| {
            Ok(Box::new(ConstantSource::new(ctx.ports, values.clone())) as Box<dyn ModuleDriver>)
        }
    }
}

impl ModuleDriver for ConstantSource {
    fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
        let frame = Frame::scalars(time, self.values.clone());
        for port in self.ports.iter_mut() {
            port.send(&frame)?;
        }
        Ok(())
    }

    fn execute(&mut self, _time: u64, _step: u64) -> CouplingResult<()> {
        Ok(())
    }
}
