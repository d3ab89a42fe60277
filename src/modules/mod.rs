//! Reusable module drivers.
//!
//! Small building blocks that exercise the full coupling contract; useful
//! for wiring test networks and as templates for domain modules. Each file
//! exports the driver plus a factory suitable for
//! [`ModuleRegistry::register`](crate::core::registry::ModuleRegistry::register).

pub mod gain;
pub mod noise;
pub mod sink;
pub mod source;

pub use gain::Gain;
pub use noise::NoisySource;
pub use sink::Collector;
pub use source::ConstantSource;
