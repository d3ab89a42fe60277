//! Error taxonomy for the coupling core.
//!
//! Every boundary operation returns `CouplingResult`; recoverable conditions
//! are never signalled through panics or assertions. Configuration and
//! topology errors are fatal at build time, transport stalls surface as
//! typed timeouts, and send/receive on an unconnected port fails fast.

use thiserror::Error;

use super::types::SlotId;

/// The top-level error type for the coupling engine.
#[derive(Debug, Error)]
pub enum CouplingError {
    /// Malformed specification or misuse of a component at build time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A connectivity specification describes an invalid topology.
    #[error("invalid topology in network '{network}': {reason}")]
    InvalidTopology { network: String, reason: String },

    /// No driver is registered for a slot's module type.
    #[error("no module driver registered for type '{0}'")]
    ModuleNotFound(String),

    /// No task is registered under the given name.
    #[error("no task registered under name '{0}'")]
    TaskNotFound(String),

    /// Send or receive on a port that was never connected.
    #[error("port '{port}' on slot '{slot}' is not connected")]
    NotConnected { slot: SlotId, port: String },

    /// The peer endpoint of a port went away.
    #[error("peer of port '{port}' on slot '{slot}' disconnected")]
    Disconnected { slot: SlotId, port: String },

    /// A receive expired waiting for a time-tagged record.
    #[error("timed out waiting for record t={time} on port '{port}' of slot '{slot}'")]
    Timeout { slot: SlotId, port: String, time: u64 },

    /// A port or status document could not be parsed.
    #[error("malformed document '{path}': {reason}")]
    Document { path: String, reason: String },

    /// Underlying filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A status record tried to move backwards in its state machine.
    #[error("status of slot '{slot}' cannot move from '{from}' to '{to}'")]
    StatusRegression {
        slot: SlotId,
        from: &'static str,
        to: &'static str,
    },

    /// A slot aborted its advancement loop.
    #[error("slot '{slot}' failed: {reason}")]
    SlotFailed { slot: SlotId, reason: String },
}

/// Convenience alias for `Result<T, CouplingError>`.
pub type CouplingResult<T> = Result<T, CouplingError>;
