//! In-process transport over bounded synchronous channels.
//!
//! Each connected port pair gets two bounded queues, one per direction.
//! `send` blocks when the peer's queue is full; `recv` blocks until the
//! requested time tag arrives, bounded by a configurable timeout that yields
//! a typed error instead of an open-ended stall.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use log::warn;

use super::{Endpoint, Transport};
use crate::core::error::{CouplingError, CouplingResult};
use crate::core::frame::Frame;

/// One direction-pair of a connected in-process port link.
pub struct ChannelTransport {
    local: Endpoint,
    tx: SyncSender<Frame>,
    rx: Receiver<Frame>,
    recv_timeout: Duration,
    /// A frame received ahead of the requested tag, held for the next call.
    lookahead: Option<Frame>,
}

/// Create the two halves of an in-process link between endpoints `a` and `b`.
pub fn channel_pair(
    a: Endpoint,
    b: Endpoint,
    capacity: usize,
    recv_timeout: Duration,
) -> (ChannelTransport, ChannelTransport) {
    let (a_tx, b_rx) = mpsc::sync_channel(capacity);
    let (b_tx, a_rx) = mpsc::sync_channel(capacity);
    (
        ChannelTransport {
            local: a,
            tx: a_tx,
            rx: a_rx,
            recv_timeout,
            lookahead: None,
        },
        ChannelTransport {
            local: b,
            tx: b_tx,
            rx: b_rx,
            recv_timeout,
            lookahead: None,
        },
    )
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: &Frame) -> CouplingResult<()> {
        self.tx
            .send(frame.clone())
            .map_err(|_| CouplingError::Disconnected {
                slot: self.local.slot.clone(),
                port: self.local.port.clone(),
            })
    }

    fn recv(&mut self, time: u64) -> CouplingResult<Frame> {
        loop {
            let frame = match self.lookahead.take() {
                Some(f) => f,
                None => match self.rx.recv_timeout(self.recv_timeout) {
                    Ok(f) => f,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(CouplingError::Timeout {
                            slot: self.local.slot.clone(),
                            port: self.local.port.clone(),
                            time,
                        })
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(CouplingError::Disconnected {
                            slot: self.local.slot.clone(),
                            port: self.local.port.clone(),
                        })
                    }
                },
            };
            if frame.time == time {
                return Ok(frame);
            }
            if frame.time < time {
                warn!(
                    "{}: skipping stale record t={} while waiting for t={}",
                    self.local, frame.time, time
                );
                continue;
            }
            // Peer is already past the requested tag; that record will never
            // arrive. Keep the frame for the next call and fail fast.
            let peer_time = frame.time;
            self.lookahead = Some(frame);
            return Err(CouplingError::Configuration(format!(
                "{}: requested record t={} but peer already advanced to t={}",
                self.local, time, peer_time
            )));
        }
    }
}
