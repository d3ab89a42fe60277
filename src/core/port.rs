//! Named, bidirectional data channels between module slots.
//!
//! A port is owned by exactly one slot and connected to peer ports at
//! network-build time, never reconnected. A use-port accepts exactly one
//! inbound connection; a provide-port may fan out to several use-ports.
//! Send and receive block; both fail fast on a port that was never
//! connected.

use std::time::Duration;

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::frame::Frame;
use crate::core::transport::{channel_pair, Endpoint, Transport};
use crate::core::types::SlotId;

/// Direction of a port relative to its owning slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// Consumes data from a connected provide-port.
    Use,
    /// Produces data for one or more connected use-ports.
    Provide,
}

/// Parameters for the in-process links created by [`Port::connect`].
#[derive(Debug, Clone, Copy)]
pub struct LinkOptions {
    /// Bounded queue capacity per direction.
    pub capacity: usize,
    /// Receive timeout before a typed error is returned.
    pub recv_timeout: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            capacity: 16,
            recv_timeout: Duration::from_secs(30),
        }
    }
}

/// One named data channel endpoint bound to a slot.
pub struct Port {
    name: String,
    owner: SlotId,
    direction: PortDirection,
    links: Vec<Box<dyn Transport>>,
    finalized: bool,
}

impl Port {
    /// Create an unconnected port.
    pub fn new(owner: SlotId, name: &str, direction: PortDirection) -> Self {
        Self {
            name: name.to_string(),
            owner,
            direction,
            links: Vec::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &SlotId {
        &self.owner
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.owner.clone(), self.name.clone())
    }

    fn check_connectable(&self) -> CouplingResult<()> {
        if self.finalized {
            return Err(CouplingError::Configuration(format!(
                "port '{}' on slot '{}' cannot be connected after the network is finalized",
                self.name, self.owner
            )));
        }
        if self.direction == PortDirection::Use && self.is_connected() {
            return Err(CouplingError::Configuration(format!(
                "use-port '{}' on slot '{}' is already connected",
                self.name, self.owner
            )));
        }
        Ok(())
    }

    /// Bind two ports symmetrically over an in-process link.
    ///
    /// One side must be a provide-port and the other a use-port. The
    /// provide side may be connected repeatedly (fan-out); the use side
    /// exactly once. Fails after either port has been finalized.
    pub fn connect(&mut self, other: &mut Port, opts: &LinkOptions) -> CouplingResult<()> {
        self.check_connectable()?;
        other.check_connectable()?;
        if self.direction == other.direction {
            return Err(CouplingError::Configuration(format!(
                "cannot connect '{}' on '{}' to '{}' on '{}': a provide-port must pair with a use-port",
                self.name, self.owner, other.name, other.owner
            )));
        }
        let (self_link, other_link) = channel_pair(
            self.endpoint(),
            other.endpoint(),
            opts.capacity,
            opts.recv_timeout,
        );
        self.links.push(Box::new(self_link));
        other.links.push(Box::new(other_link));
        Ok(())
    }

    /// Attach an externally built transport (e.g. a file-backed link).
    ///
    /// Subject to the same connection rules as [`Port::connect`].
    pub fn attach(&mut self, link: Box<dyn Transport>) -> CouplingResult<()> {
        self.check_connectable()?;
        self.links.push(link);
        Ok(())
    }

    /// Freeze the port; later connection attempts are rejected.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Blocking send of one record to every connected peer.
    pub fn send(&mut self, frame: &Frame) -> CouplingResult<()> {
        if self.links.is_empty() {
            return Err(CouplingError::NotConnected {
                slot: self.owner.clone(),
                port: self.name.clone(),
            });
        }
        for link in &mut self.links {
            link.send(frame)?;
        }
        Ok(())
    }

    /// Blocking receive of the peer's record tagged `time`, FIFO per port.
    pub fn receive(&mut self, time: u64) -> CouplingResult<Frame> {
        match self.links.first_mut() {
            Some(link) => link.recv(time),
            None => Err(CouplingError::NotConnected {
                slot: self.owner.clone(),
                port: self.name.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("direction", &self.direction)
            .field("links", &self.links.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}

/// The ordered set of ports bound to one slot.
#[derive(Debug, Default)]
pub struct PortSet {
    ports: Vec<Port>,
}

impl PortSet {
    /// Build a port set, rejecting duplicate names.
    pub fn new(ports: Vec<Port>) -> CouplingResult<Self> {
        for (i, port) in ports.iter().enumerate() {
            if ports[..i].iter().any(|p| p.name() == port.name()) {
                return Err(CouplingError::Configuration(format!(
                    "slot '{}' declares port name '{}' more than once",
                    port.owner(),
                    port.name()
                )));
            }
        }
        Ok(Self { ports })
    }

    /// Look up a port by name.
    pub fn get_mut(&mut self, name: &str) -> CouplingResult<&mut Port> {
        let owner = self.ports.first().map(|p| p.owner().clone());
        self.ports
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| {
                CouplingError::Configuration(format!(
                    "no port named '{}' on slot '{}'",
                    name,
                    owner.map(|s| s.to_string()).unwrap_or_default()
                ))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.ports.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.ports.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
