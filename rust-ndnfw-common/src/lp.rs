//! NDNLPv2 link-layer packets.
//!
//! A link-layer packet wraps (a fragment of) a network-layer packet together
//! with per-link headers: fragmentation bookkeeping, Nack headers, and
//! congestion marks. A bare Interest or Data is also a valid link-layer
//! packet and decodes to an `LpPacket` whose only field is the fragment.

use crate::error::Error;
use crate::packet::NackReason;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};

/// Decoded Nack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NackHeader {
    pub reason: Option<NackReason>,
}

impl NackHeader {
    pub fn new(reason: NackReason) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    /// The effective reason; an absent reason decodes as `None`.
    pub fn reason(&self) -> NackReason {
        self.reason.unwrap_or(NackReason::None)
    }
}

/// A decoded NDNLPv2 packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpPacket {
    pub sequence: Option<u64>,
    pub frag_index: Option<u64>,
    pub frag_count: Option<u64>,
    pub hop_count: Option<u64>,
    pub nack: Option<NackHeader>,
    pub congestion_mark: Option<u64>,
    pub fragment: Option<Bytes>,
}

impl LpPacket {
    /// Wraps a whole network packet with no link headers.
    pub fn bare(fragment: impl Into<Bytes>) -> Self {
        Self {
            fragment: Some(fragment.into()),
            ..Default::default()
        }
    }

    /// True when the packet carries no header other than the fragment, so it
    /// can be emitted as a bare network packet.
    pub fn is_bare(&self) -> bool {
        self.sequence.is_none()
            && self.frag_index.is_none()
            && self.frag_count.is_none()
            && self.hop_count.is_none()
            && self.nack.is_none()
            && self.congestion_mark.is_none()
    }

    pub fn frag_index(&self) -> u64 {
        self.frag_index.unwrap_or(0)
    }

    pub fn frag_count(&self) -> u64 {
        self.frag_count.unwrap_or(1)
    }

    pub fn to_wire(&self) -> Bytes {
        // A headerless whole packet goes out bare, not wrapped.
        if self.is_bare() {
            if let Some(fragment) = &self.fragment {
                return fragment.clone();
            }
        }

        let mut inner = BytesMut::new();
        if let Some(sequence) = self.sequence {
            // Sequence is fixed-width 8 bytes so it can be rewritten in place.
            TlvElement::new(
                tlv::TLV_LP_SEQUENCE,
                Bytes::copy_from_slice(&sequence.to_be_bytes()),
            )
            .encode(&mut inner);
        }
        if let Some(frag_index) = self.frag_index {
            TlvElement::from_nonneg_integer(tlv::TLV_LP_FRAG_INDEX, frag_index).encode(&mut inner);
        }
        if let Some(frag_count) = self.frag_count {
            TlvElement::from_nonneg_integer(tlv::TLV_LP_FRAG_COUNT, frag_count).encode(&mut inner);
        }
        if let Some(hop_count) = self.hop_count {
            TlvElement::from_nonneg_integer(tlv::TLV_LP_HOP_COUNT, hop_count).encode(&mut inner);
        }
        if let Some(nack) = &self.nack {
            let mut header = BytesMut::new();
            if let Some(reason) = nack.reason {
                TlvElement::from_nonneg_integer(tlv::TLV_LP_NACK_REASON, reason.code())
                    .encode(&mut header);
            }
            TlvElement::new(tlv::TLV_LP_NACK, header.freeze()).encode(&mut inner);
        }
        if let Some(mark) = self.congestion_mark {
            TlvElement::from_nonneg_integer(tlv::TLV_LP_CONGESTION_MARK, mark).encode(&mut inner);
        }
        // The fragment is always the last field.
        if let Some(fragment) = &self.fragment {
            TlvElement::new(tlv::TLV_LP_FRAGMENT, fragment.clone()).encode(&mut inner);
        }

        let mut wire = BytesMut::new();
        TlvElement::new(tlv::TLV_LP_PACKET, inner.freeze()).encode(&mut wire);
        wire.freeze()
    }

    pub fn from_wire(wire: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(wire);
        let outer = TlvElement::decode(&mut buf)?;

        // Bare network packets pass through the link layer unwrapped.
        if outer.tlv_type == tlv::TLV_INTEREST || outer.tlv_type == tlv::TLV_DATA {
            return Ok(LpPacket::bare(Bytes::copy_from_slice(wire)));
        }

        if outer.tlv_type != tlv::TLV_LP_PACKET {
            return Err(Error::LinkProtocol(format!(
                "Unrecognized link packet TLV type {}",
                outer.tlv_type
            )));
        }

        let mut packet = LpPacket::default();
        let mut inner = outer.value.clone();
        while inner.has_remaining() {
            let element = TlvElement::decode(&mut inner)?;
            match element.tlv_type {
                tlv::TLV_LP_SEQUENCE => {
                    if element.value.len() != 8 {
                        return Err(Error::LinkProtocol("Sequence must be 8 bytes".into()));
                    }
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&element.value);
                    packet.sequence = Some(u64::from_be_bytes(bytes));
                }
                tlv::TLV_LP_FRAG_INDEX => packet.frag_index = Some(element.as_nonneg_integer()?),
                tlv::TLV_LP_FRAG_COUNT => packet.frag_count = Some(element.as_nonneg_integer()?),
                tlv::TLV_LP_HOP_COUNT => packet.hop_count = Some(element.as_nonneg_integer()?),
                tlv::TLV_LP_NACK => {
                    let mut header = NackHeader::default();
                    let mut fields = element.value.clone();
                    while fields.has_remaining() {
                        let field = TlvElement::decode(&mut fields)?;
                        if field.tlv_type == tlv::TLV_LP_NACK_REASON {
                            header.reason =
                                Some(NackReason::from_code(field.as_nonneg_integer()?));
                        }
                    }
                    packet.nack = Some(header);
                }
                tlv::TLV_LP_CONGESTION_MARK => {
                    packet.congestion_mark = Some(element.as_nonneg_integer()?)
                }
                tlv::TLV_LP_FRAGMENT => packet.fragment = Some(element.value.clone()),
                _ => {}
            }
        }

        Ok(packet)
    }
}
