//! A source with uniform jitter around a mean.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::error::CouplingResult;
use crate::core::frame::Frame;
use crate::core::port::PortSet;
use crate::core::registry::{ModuleContext, ModuleDriver};

/// Publishes `mean ± amplitude` (uniform) for one variable each cycle.
pub struct NoisySource {
    ports: PortSet,
    variable: String,
    mean: f64,
    amplitude: f64,
    rng: StdRng,
}

impl NoisySource {
    pub fn new(ports: PortSet, variable: &str, mean: f64, amplitude: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            ports,
            variable: variable.to_string(),
            mean,
            amplitude,
            rng,
        }
    }

    /// Registry factory; a fixed seed makes every instance deterministic.
    pub fn factory(
        variable: &str,
        mean: f64,
        amplitude: f64,
        seed: Option<u64>,
    ) -> impl Fn(ModuleContext) -> CouplingResult<Box<dyn ModuleDriver>> + Send + Sync + 'static
    {
        let variable = variable.to_string();
        move |ctx| {
            Ok(Box::new(NoisySource::new(ctx.ports, &variable, mean, amplitude, seed))
                as Box<dyn ModuleDriver>)
        }
    }
}

impl ModuleDriver for NoisySource {
    fn call_ports(&mut self, time: u64) -> CouplingResult<()> {
        let value = if self.amplitude > 0.0 {
            self.rng.gen_range(self.mean - self.amplitude..=self.mean + self.amplitude)
        } else {
            self.mean
        };
        let frame = Frame::scalar(time, &self.variable, value);
        for port in self.ports.iter_mut() {
            port.send(&frame)?;
        }
        Ok(())
    }

    fn execute(&mut self, _time: u64, _step: u64) -> CouplingResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::port::{LinkOptions, Port, PortDirection};
    use crate::core::types::SlotId;
    use std::time::Duration;

    #[test]
    fn test_values_stay_within_band() {
        let mut out = Port::new(SlotId::new("noise", "1"), "out", PortDirection::Provide);
        let mut peer = Port::new(SlotId::new("sink", "1"), "in", PortDirection::Use);
        let opts = LinkOptions {
            capacity: 16,
            recv_timeout: Duration::from_millis(50),
        };
        out.connect(&mut peer, &opts).unwrap();

        let ports = PortSet::new(vec![out]).unwrap();
        let mut source = NoisySource::new(ports, "flow", 10.0, 2.0, Some(7));

        for t in 0..10u64 {
            source.call_ports(t).unwrap();
            let value = peer.receive(t).unwrap().get("flow").unwrap();
            assert!((8.0..=12.0).contains(&value));
        }
    }

    #[test]
    fn test_seeded_instances_agree() {
        let make = |seed| {
            let mut out = Port::new(SlotId::new("noise", "1"), "out", PortDirection::Provide);
            let mut peer = Port::new(SlotId::new("sink", "1"), "in", PortDirection::Use);
            let opts = LinkOptions {
                capacity: 4,
                recv_timeout: Duration::from_millis(50),
            };
            out.connect(&mut peer, &opts).unwrap();
            let mut source =
                NoisySource::new(PortSet::new(vec![out]).unwrap(), "flow", 1.0, 0.5, Some(seed));
            source.call_ports(0).unwrap();
            peer.receive(0).unwrap().get("flow").unwrap()
        };
        assert_eq!(make(42), make(42));
    }
}
