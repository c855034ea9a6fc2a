//! Faces: the forwarder's communication endpoints.
//!
//! A face pairs a link service with a transport and owns its counters and
//! state lifecycle. Faces are held by the `FaceTable` and referenced
//! everywhere else by `FaceId`, so closing a face can never leave dangling
//! references in the tables.

pub mod face_table;
pub mod link_service;
pub mod lp_reassembler;
pub mod transport;

pub use self::face_table::FaceTable;
pub use self::link_service::{LinkService, LinkServiceOptions};
pub use self::lp_reassembler::EndpointId;

use crate::scheduler::{Scheduler, TimerEvent};
use crate::signal::Signal;
use log::{debug, trace, warn};
use rust_ndnfw_common::lp::{LpPacket, NackHeader};
use rust_ndnfw_common::metrics::Counter;
use rust_ndnfw_common::packet::{Data, Interest, Nack, NdnPacket};
use rust_ndnfw_common::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use self::transport::Transport;
use std::time::Instant;

/// Unique identifier for a face. Id 0 is reserved as invalid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FaceId(u64);

impl FaceId {
    pub const INVALID: FaceId = FaceId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the remote end is on the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceScope {
    NonLocal,
    Local,
}

/// Face lifecycle state. Transitions are monotonic except UP and DOWN,
/// which may alternate while the link flaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceState {
    Up,
    Down,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for FaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaceState::Up => "up",
            FaceState::Down => "down",
            FaceState::Closing => "closing",
            FaceState::Closed => "closed",
            FaceState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

fn transition_allowed(from: FaceState, to: FaceState) -> bool {
    use FaceState::*;
    matches!(
        (from, to),
        (Up, Down)
            | (Down, Up)
            | (Up, Closing)
            | (Down, Closing)
            | (Closing, Closed)
            | (Up, Failed)
            | (Down, Failed)
            | (Failed, Closed)
    )
}

/// Per-face traffic counters. Monotonic; never reset while the face lives.
#[derive(Debug, Default, Clone)]
pub struct FaceCounters {
    pub n_in_interests: Counter,
    pub n_in_data: Counter,
    pub n_in_nacks: Counter,
    pub n_out_interests: Counter,
    pub n_out_data: Counter,
    pub n_out_nacks: Counter,
    pub n_in_bytes: Counter,
    pub n_out_bytes: Counter,
    pub n_dropped_malformed: Counter,
}

/// A packet delivered by a face to the forwarder.
#[derive(Debug)]
pub enum RxPacket {
    Interest(Interest),
    Data(Data),
    Nack(Nack),
}

pub struct Face {
    id: FaceId,
    scope: FaceScope,
    state: FaceState,
    link_service: LinkService,
    transport: Box<dyn Transport>,
    counters: FaceCounters,
    /// Emitted as (old, new) on every state transition.
    pub after_state_change: Signal<(FaceState, FaceState)>,
}

impl Face {
    pub fn new(
        id: FaceId,
        scope: FaceScope,
        link_service: LinkService,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            id,
            scope,
            state: FaceState::Up,
            link_service,
            transport,
            counters: FaceCounters::default(),
            after_state_change: Signal::new(),
        }
    }

    pub fn id(&self) -> FaceId {
        self.id
    }

    pub fn scope(&self) -> FaceScope {
        self.scope
    }

    pub fn state(&self) -> FaceState {
        self.state
    }

    pub fn is_up(&self) -> bool {
        self.state == FaceState::Up
    }

    pub fn counters(&self) -> &FaceCounters {
        &self.counters
    }

    pub fn local_uri(&self) -> &str {
        self.transport.local_uri()
    }

    pub fn remote_uri(&self) -> &str {
        self.transport.remote_uri()
    }

    pub fn link_service(&self) -> &LinkService {
        &self.link_service
    }

    pub fn link_service_mut(&mut self) -> &mut LinkService {
        &mut self.link_service
    }

    pub fn set_state(&mut self, to: FaceState) {
        if self.state == to {
            return;
        }
        if !transition_allowed(self.state, to) {
            warn!(
                "[face {}] invalid state transition {} -> {}",
                self.id, self.state, to
            );
            return;
        }
        let old = self.state;
        self.state = to;
        debug!("[face {}] state {} -> {}", self.id, old, to);
        self.after_state_change.emit(&(old, to));
    }

    /// Graceful close: CLOSING then CLOSED.
    pub fn close(&mut self) {
        if matches!(self.state, FaceState::Closed) {
            return;
        }
        self.set_state(FaceState::Closing);
        self.set_state(FaceState::Closed);
    }

    /// Close after a fatal transport error: FAILED then CLOSED.
    pub fn fail(&mut self) {
        if matches!(self.state, FaceState::Closed) {
            return;
        }
        self.set_state(FaceState::Failed);
        self.set_state(FaceState::Closed);
    }

    pub fn send_interest(&mut self, interest: &Interest) -> Result<()> {
        trace!("[face {}] send Interest {}", self.id, interest.name);
        let sent = self.link_service.send_network_packet(
            self.transport.as_mut(),
            self.id,
            interest.to_wire(),
            None,
        )?;
        self.counters.n_out_interests.increment();
        self.counters.n_out_bytes.add(sent as u64);
        Ok(())
    }

    pub fn send_data(&mut self, data: &Data) -> Result<()> {
        trace!("[face {}] send Data {}", self.id, data.name);
        let sent = self.link_service.send_network_packet(
            self.transport.as_mut(),
            self.id,
            data.to_wire(),
            None,
        )?;
        self.counters.n_out_data.increment();
        self.counters.n_out_bytes.add(sent as u64);
        Ok(())
    }

    pub fn send_nack(&mut self, nack: &Nack) -> Result<()> {
        trace!(
            "[face {}] send Nack {} {}",
            self.id,
            nack.reason,
            nack.interest.name
        );
        let sent = self.link_service.send_network_packet(
            self.transport.as_mut(),
            self.id,
            nack.interest.to_wire(),
            Some(NackHeader::new(nack.reason)),
        )?;
        self.counters.n_out_nacks.increment();
        self.counters.n_out_bytes.add(sent as u64);
        Ok(())
    }

    /// Processes one received link packet; returns the decoded network
    /// packet once a whole one is available.
    pub fn receive(
        &mut self,
        scheduler: &mut Scheduler<TimerEvent>,
        now: Instant,
        endpoint: EndpointId,
        wire: &[u8],
    ) -> Option<RxPacket> {
        self.counters.n_in_bytes.add(wire.len() as u64);

        let lp = match LpPacket::from_wire(wire) {
            Ok(lp) => lp,
            Err(e) => {
                debug!("[face {}] malformed link packet: {}", self.id, e);
                self.counters.n_dropped_malformed.increment();
                return None;
            }
        };

        let (network, first) =
            self.link_service
                .receive_packet(scheduler, now, self.id, endpoint, lp)?;

        match NdnPacket::from_bytes(&network) {
            Ok(NdnPacket::Interest(interest)) => match first.nack {
                Some(header) => {
                    self.counters.n_in_nacks.increment();
                    Some(RxPacket::Nack(Nack::new(header.reason(), interest)))
                }
                None => {
                    self.counters.n_in_interests.increment();
                    Some(RxPacket::Interest(interest))
                }
            },
            Ok(NdnPacket::Data(data)) => {
                self.counters.n_in_data.increment();
                Some(RxPacket::Data(data))
            }
            Err(e) => {
                debug!("[face {}] malformed network packet: {}", self.id, e);
                self.counters.n_dropped_malformed.increment();
                None
            }
        }
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("state", &self.state)
            .field("local_uri", &self.local_uri())
            .field("remote_uri", &self.remote_uri())
            .finish()
    }
}
