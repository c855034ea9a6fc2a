//! Reassembly of fragmented link-layer packets.
//!
//! Fragments of one network packet share a message identifier, recovered as
//! `sequence - frag_index`, and are collected per (remote endpoint, message
//! id). A partial packet that does not complete within the reassembly
//! timeout is dropped and announced through the `before_timeout` signal.

use crate::face::FaceId;
use crate::scheduler::{EventId, Scheduler, TimerEvent};
use crate::signal::Signal;
use bytes::BytesMut;
use log::{trace, warn};
use rust_ndnfw_common::lp::LpPacket;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

/// Identifies the sender on a shared link (e.g. the datagram source); faces
/// over point-to-point links use a single endpoint id.
pub type EndpointId = u64;

/// Reassembly bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReassemblyKey {
    pub endpoint: EndpointId,
    pub message_id: u64,
}

#[derive(Debug, Clone)]
pub struct LpReassemblerOptions {
    /// Upper bound on FragCount; packets claiming more fragments are dropped.
    pub n_max_fragments: u64,
    /// How long a partial packet may wait for its remaining fragments.
    pub reassembly_timeout: Duration,
}

impl Default for LpReassemblerOptions {
    fn default() -> Self {
        Self {
            n_max_fragments: 400,
            reassembly_timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
struct PartialPacket {
    frag_count: u64,
    n_received: usize,
    fragments: Vec<Option<LpPacket>>,
    drop_timer: Option<EventId>,
}

/// Outcome of feeding one fragment to the reassembler.
#[derive(Debug)]
pub enum ReassemblyResult {
    /// A whole network packet, plus the link headers of its first fragment.
    Complete(bytes::Bytes, Box<LpPacket>),
    /// Stored; more fragments are needed.
    Incomplete,
    /// The fragment was invalid or redundant.
    Drop,
}

pub struct LpReassembler {
    options: LpReassemblerOptions,
    partial_packets: HashMap<ReassemblyKey, PartialPacket>,
    /// Emitted as (endpoint, fragments received) when a partial packet times
    /// out before completing.
    pub before_timeout: Signal<(EndpointId, usize)>,
}

impl LpReassembler {
    pub fn new(options: LpReassemblerOptions) -> Self {
        Self {
            options,
            partial_packets: HashMap::new(),
            before_timeout: Signal::new(),
        }
    }

    pub fn options(&self) -> &LpReassemblerOptions {
        &self.options
    }

    /// Number of partial packets currently buffered.
    pub fn n_partial_packets(&self) -> usize {
        self.partial_packets.len()
    }

    pub fn receive_fragment(
        &mut self,
        scheduler: &mut Scheduler<TimerEvent>,
        now: Instant,
        face: FaceId,
        endpoint: EndpointId,
        packet: LpPacket,
    ) -> ReassemblyResult {
        let frag_index = packet.frag_index();
        let frag_count = packet.frag_count();

        if frag_index >= frag_count {
            warn!("[face {}] reassembly error, FragIndex>=FragCount: DROP", face);
            return ReassemblyResult::Drop;
        }
        if frag_count > self.options.n_max_fragments {
            warn!("[face {}] reassembly error, FragCount over limit: DROP", face);
            return ReassemblyResult::Drop;
        }

        // Fast path: unfragmented packet.
        if frag_index == 0 && frag_count == 1 {
            let Some(fragment) = packet.fragment.clone() else {
                return ReassemblyResult::Drop;
            };
            return ReassemblyResult::Complete(fragment, Box::new(packet));
        }

        let Some(sequence) = packet.sequence else {
            warn!("[face {}] reassembly error, Sequence missing: DROP", face);
            return ReassemblyResult::Drop;
        };
        let key = ReassemblyKey {
            endpoint,
            message_id: sequence.wrapping_sub(frag_index),
        };

        let partial = self
            .partial_packets
            .entry(key)
            .or_insert_with(|| PartialPacket {
                frag_count,
                n_received: 0,
                fragments: {
                    let mut slots = Vec::with_capacity(frag_count as usize);
                    slots.resize_with(frag_count as usize, || None);
                    slots
                },
                drop_timer: None,
            });

        if partial.frag_count != frag_count {
            warn!("[face {}] reassembly error, FragCount changed: DROP", face);
            return ReassemblyResult::Drop;
        }
        if partial.fragments[frag_index as usize].is_some() {
            trace!("[face {}] fragment already received: DROP", face);
            return ReassemblyResult::Drop;
        }

        partial.fragments[frag_index as usize] = Some(packet);
        partial.n_received += 1;

        if partial.n_received as u64 == frag_count {
            if let Some(timer) = partial.drop_timer.take() {
                scheduler.cancel(timer);
            }
            let Some(partial) = self.partial_packets.remove(&key) else {
                return ReassemblyResult::Drop;
            };
            return Self::do_reassembly(partial);
        }

        // Every fragment pushes the drop deadline out again.
        if let Some(timer) = partial.drop_timer.take() {
            scheduler.cancel(timer);
        }
        partial.drop_timer = Some(scheduler.schedule(
            now + self.options.reassembly_timeout,
            TimerEvent::ReassemblyTimeout { face, key },
        ));

        ReassemblyResult::Incomplete
    }

    /// Handles a fired drop timer. The partial packet may already be gone;
    /// the stale lookup is simply a no-op.
    pub fn on_timeout(&mut self, key: ReassemblyKey) {
        if let Some(partial) = self.partial_packets.remove(&key) {
            self.before_timeout.emit(&(key.endpoint, partial.n_received));
        }
    }

    fn do_reassembly(partial: PartialPacket) -> ReassemblyResult {
        let payload_size: usize = partial
            .fragments
            .iter()
            .flatten()
            .map(|f| f.fragment.as_ref().map_or(0, |b| b.len()))
            .sum();

        let mut buffer = BytesMut::with_capacity(payload_size);
        let mut fragments = partial.fragments.into_iter();
        let Some(Some(first)) = fragments.next() else {
            return ReassemblyResult::Drop;
        };
        if let Some(bytes) = &first.fragment {
            buffer.extend_from_slice(bytes);
        }
        for fragment in fragments.flatten() {
            if let Some(bytes) = &fragment.fragment {
                buffer.extend_from_slice(bytes);
            }
        }

        ReassemblyResult::Complete(buffer.freeze(), Box::new(first))
    }
}

impl std::fmt::Debug for LpReassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LpReassembler")
            .field("partial_packets", &self.partial_packets.len())
            .finish()
    }
}
