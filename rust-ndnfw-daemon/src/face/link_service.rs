//! Per-face framing between network packets and the link layer.
//!
//! On the way out the link service wraps network packets into link packets,
//! splitting them into fragments when they exceed the transport MTU, encodes
//! Nack headers, and applies congestion marks when the transport queue backs
//! up. On the way in it decodes link packets and feeds fragments to the
//! reassembler.

use crate::face::lp_reassembler::{
    EndpointId, LpReassembler, LpReassemblerOptions, ReassemblyResult,
};
use crate::face::transport::Transport;
use crate::face::FaceId;
use crate::scheduler::{Scheduler, TimerEvent};
use bytes::Bytes;
use log::{debug, warn};
use rust_ndnfw_common::lp::{LpPacket, NackHeader};
use rust_ndnfw_common::{Error, Result};
use std::time::Instant;

/// Worst-case bytes of link headers per fragment: the outer TLV, sequence,
/// fragmentation fields, and a congestion mark.
const LP_HEADER_OVERHEAD: usize = 40;

#[derive(Debug, Clone)]
pub struct LinkServiceOptions {
    /// Send queue depth (bytes) above which outbound packets are marked.
    pub congestion_threshold: usize,
    pub reassembler: LpReassemblerOptions,
}

impl Default for LinkServiceOptions {
    fn default() -> Self {
        Self {
            congestion_threshold: 65536,
            reassembler: LpReassemblerOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct LinkService {
    options: LinkServiceOptions,
    reassembler: LpReassembler,
    next_sequence: u64,
}

impl LinkService {
    pub fn new(options: LinkServiceOptions) -> Self {
        let reassembler = LpReassembler::new(options.reassembler.clone());
        Self {
            options,
            reassembler,
            next_sequence: 0,
        }
    }

    pub fn options(&self) -> &LinkServiceOptions {
        &self.options
    }

    pub fn reassembler(&self) -> &LpReassembler {
        &self.reassembler
    }

    pub fn reassembler_mut(&mut self) -> &mut LpReassembler {
        &mut self.reassembler
    }

    /// Sends a network packet, fragmenting as needed. Returns the total link
    /// bytes handed to the transport.
    pub fn send_network_packet(
        &mut self,
        transport: &mut dyn Transport,
        face: FaceId,
        wire: Bytes,
        nack: Option<NackHeader>,
    ) -> Result<usize> {
        let congestion_mark = if transport.send_queue_length() > self.options.congestion_threshold {
            debug!("[face {}] send queue over threshold, marking congestion", face);
            Some(1)
        } else {
            None
        };

        let needs_fragmentation = transport
            .mtu()
            .is_some_and(|mtu| wire.len() + LP_HEADER_OVERHEAD > mtu);

        if !needs_fragmentation {
            let packet = LpPacket {
                nack,
                congestion_mark,
                fragment: Some(wire),
                ..Default::default()
            };
            let encoded = packet.to_wire();
            let sent = encoded.len();
            transport.send(encoded)?;
            return Ok(sent);
        }

        // Nacks are single link packets by construction; an oversized one
        // cannot be expressed on this link.
        if nack.is_some() {
            return Err(Error::Face("Nack exceeds the transport MTU".into()));
        }

        let mtu = transport.mtu().unwrap_or(usize::MAX);
        let payload_size = mtu.saturating_sub(LP_HEADER_OVERHEAD);
        if payload_size == 0 {
            return Err(Error::Face(format!("MTU {} leaves no room for payload", mtu)));
        }

        let frag_count = (wire.len() + payload_size - 1) / payload_size;
        debug!(
            "[face {}] fragmenting {} bytes into {} fragments",
            face,
            wire.len(),
            frag_count
        );

        let mut sent = 0;
        for index in 0..frag_count {
            let start = index * payload_size;
            let end = (start + payload_size).min(wire.len());
            let packet = LpPacket {
                sequence: Some(self.next_sequence.wrapping_add(index as u64)),
                frag_index: Some(index as u64),
                frag_count: Some(frag_count as u64),
                congestion_mark: if index == 0 { congestion_mark } else { None },
                fragment: Some(wire.slice(start..end)),
                ..Default::default()
            };
            let encoded = packet.to_wire();
            sent += encoded.len();
            transport.send(encoded)?;
        }
        self.next_sequence = self.next_sequence.wrapping_add(frag_count as u64);

        Ok(sent)
    }

    /// Decodes one link packet and runs reassembly. Returns a whole network
    /// packet plus the link headers of its first fragment, or None while the
    /// message is still incomplete (or was dropped).
    pub fn receive_packet(
        &mut self,
        scheduler: &mut Scheduler<TimerEvent>,
        now: Instant,
        face: FaceId,
        endpoint: EndpointId,
        packet: LpPacket,
    ) -> Option<(Bytes, LpPacket)> {
        if packet.fragment.is_none() {
            // IDLE packets carry only headers; nothing to deliver.
            warn!("[face {}] link packet without fragment: DROP", face);
            return None;
        }

        match self
            .reassembler
            .receive_fragment(scheduler, now, face, endpoint, packet)
        {
            ReassemblyResult::Complete(network, first) => Some((network, *first)),
            ReassemblyResult::Incomplete | ReassemblyResult::Drop => None,
        }
    }
}
