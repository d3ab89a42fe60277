//! # Coupler
//!
//! A module-coupling execution core for lock-step co-simulation. Independent
//! simulation modules advance through shared simulated time in synchronized
//! cycles while exchanging data through typed, named ports.
//!
//! The crate provides:
//!
//! - **Ports**: named, bidirectional data channels between exactly two
//!   endpoints, with blocking send/receive semantics.
//! - **Networks**: validated directed multigraphs wiring module slots
//!   together via (from-port, to-port) edges.
//! - **A registry/launcher**: module-type name → driver factory resolution,
//!   with one self-driving thread per slot.
//! - **A scheduler**: drives all slots of a network through one task's time
//!   window and monitors per-slot liveness until every slot reports finished.
//!
//! Each launched slot runs the coupling loop on its own thread:
//!
//! ```text
//! while t <= evolve { call_ports(t); execute(t, step); t += step; }
//! ```
//!
//! Ports before execute, every cycle: a module never advances state on port
//! data staler than the current step.

pub mod core;
pub mod modules;

// Re-export commonly used types
pub use crate::core::config::{ConnectivitySpec, EdgeSpec, TaskSpec};
pub use crate::core::error::{CouplingError, CouplingResult};
pub use crate::core::frame::{Frame, FramePayload};
pub use crate::core::network::{Edge, Network};
pub use crate::core::port::{LinkOptions, Port, PortDirection, PortSet};
pub use crate::core::registry::{ModuleContext, ModuleDriver, ModuleRegistry};
pub use crate::core::scheduler::{Scheduler, TaskConfig, TaskReport, TaskState};
pub use crate::core::status::{AggregateStatus, SlotStatus, StatusMonitor, StatusStore};
pub use crate::core::time::{TimeUnit, TimeWindow};
pub use crate::core::types::SlotId;

/// Initialize env_logger for binaries and examples.
///
/// Honors `RUST_LOG`; falls back to the given level when unset.
pub fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}
