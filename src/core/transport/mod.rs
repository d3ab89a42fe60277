//! Port transports.
//!
//! A transport moves frames along one direction of one connected port pair.
//! The in-process [`channel`] transport gives the direct blocking semantics
//! of the port contract; the [`file`] transport is the degraded-mode variant
//! for cross-process coupling, built on the [`document`] codec.

pub mod channel;
pub mod document;
pub mod file;

pub use channel::{channel_pair, ChannelTransport};
pub use document::{DocumentFormat, DocumentHeader, PortDocument};
pub use file::{FileReader, FileWriter, RetryPolicy};

use super::error::CouplingResult;
use super::frame::Frame;
use super::types::SlotId;

/// One end of a connected port pair, for diagnostics and error context.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub slot: SlotId,
    pub port: String,
}

impl Endpoint {
    pub fn new(slot: SlotId, port: impl Into<String>) -> Self {
        Self {
            slot,
            port: port.into(),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.slot, self.port)
    }
}

/// Moves frames between the two endpoints of one connected port pair.
///
/// Within one transport, delivery is FIFO and at-least-once; there is no
/// ordering guarantee across transports.
pub trait Transport: Send {
    /// Blocking send of one frame towards the peer.
    fn send(&mut self, frame: &Frame) -> CouplingResult<()>;

    /// Blocking receive of the peer's record tagged `time`.
    ///
    /// Records staler than `time` are skipped; waiting is bounded and expiry
    /// surfaces as a typed timeout error.
    fn recv(&mut self, time: u64) -> CouplingResult<Frame>;
}
