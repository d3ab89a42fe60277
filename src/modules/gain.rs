//! A pass-through stage scaling its input.

use crate::core::error::CouplingResult;
use crate::core::frame::Frame;
use crate::core::port::{PortDirection, PortSet};
use crate::core::registry::{ModuleContext, ModuleDriver};

/// Scales the frame received on its use port by a fixed factor and
/// republishes it on its provide port one cycle later.
///
/// Publishing precedes receiving within each `call_ports`, so the value sent
/// at cycle `t` is the state computed by `execute` at `t - step`; the first
/// cycle publishes zeros. This honors the contract that provide-port data
/// for a step is never published before the corresponding `execute`.
pub struct Gain {
    ports: PortSet,
    variables: Vec<String>,
    factor: f64,
    state: Option<Frame>,
}

impl Gain {
    pub fn new(ports: PortSet, variables: Vec<String>, factor: f64) -> Self {
        Self {
            ports,
            variables,
            factor,
            state: None,
        }
    }

    /// Registry factory fixing the scaled variables and factor.
    pub fn factory(
        variables: Vec<String>,
        factor: f64,
    ) -> impl Fn(ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> + Send + Sync + 'static
    {
        move |ctx| {
            Ok(Box::new(Gain::new(ctx.ports, variables.clone(), factor)) as Box<dyn ModuleDriver>)
        }
    }
}

impl ModuleDriver for Gain {
    fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
        let mut outgoing = match self.state.take() {
            Some(frame) => frame,
            None => Frame::zeros(time, &self.variables),
        };
        outgoing.time = time;
        for port in self.ports.iter_mut() {
            if port.direction() == PortDirection::Provide {
                port.send(&outgoing)?;
            }
        }

        let mut incoming = None;
        for port in self.ports.iter_mut() {
            if port.direction() == PortDirection::Use {
                incoming = Some(port.receive(time)?);
            }
        }
        self.state = incoming;
        Ok(())
    }

    fn execute(&mut self, _time: u64, _step: u64) -> CouplingResult<()> {
        if let Some(frame) = &mut self.state {
            match &mut frame.payload {
                crate::core::frame::FramePayload::Scalars(values) => {
                    for (_, v) in values.iter_mut() {
                        *v *= self.factor;
                    }
                }
                crate::core::frame::FramePayload::Tables(columns) => {
                    for (_, column) in columns.iter_mut() {
                        for v in column.iter_mut() {
                            *v *= self.factor;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
