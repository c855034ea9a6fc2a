//! NDN network-layer packet types and wire codecs.
//!
//! This module provides the Interest, Data, and Nack structures together with
//! their standard NDN TLV encodings. Signature contents are carried opaquely;
//! the forwarder never validates them.

use crate::error::Error;
use crate::name::{Name, NameComponent};
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Maximum size of an NDN packet.
pub const MAX_NDN_PACKET_SIZE: usize = 8800;

/// Default Interest lifetime when the packet carries none.
pub const DEFAULT_INTEREST_LIFETIME_MS: u64 = 4000;

/// Hard cap on Interest lifetime (10 days). Longer lifetimes are clamped so
/// expiry arithmetic cannot overflow.
pub const MAX_INTEREST_LIFETIME_MS: u64 = 10 * 24 * 60 * 60 * 1000;

/* ---------------------------------------------------------------- *\
 * Interest
\* ---------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub nonce: u32,
    pub lifetime_ms: u64,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub hop_limit: Option<u8>,
    pub forwarding_hint: Vec<Name>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0));
        let nonce = (now.as_nanos() % u32::MAX as u128) as u32;

        Self {
            name,
            nonce,
            lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
            can_be_prefix: false,
            must_be_fresh: false,
            hop_limit: None,
            forwarding_hint: Vec::new(),
        }
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }
    pub fn with_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }
    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }
    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = Some(hop_limit);
        self
    }

    /// Interest lifetime clamped to the 10-day cap.
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms.min(MAX_INTEREST_LIFETIME_MS))
    }

    pub fn to_wire(&self) -> Bytes {
        let mut inner = BytesMut::new();
        self.name.to_tlv().encode(&mut inner);
        if self.can_be_prefix {
            TlvElement::new(tlv::TLV_CAN_BE_PREFIX, Bytes::new()).encode(&mut inner);
        }
        if self.must_be_fresh {
            TlvElement::new(tlv::TLV_MUST_BE_FRESH, Bytes::new()).encode(&mut inner);
        }
        if !self.forwarding_hint.is_empty() {
            let mut hint = BytesMut::new();
            for delegation in &self.forwarding_hint {
                delegation.to_tlv().encode(&mut hint);
            }
            TlvElement::new(tlv::TLV_FORWARDING_HINT, hint.freeze()).encode(&mut inner);
        }
        TlvElement::new(tlv::TLV_NONCE, Bytes::copy_from_slice(&self.nonce.to_be_bytes()))
            .encode(&mut inner);
        TlvElement::from_nonneg_integer(tlv::TLV_INTEREST_LIFETIME, self.lifetime_ms)
            .encode(&mut inner);
        if let Some(hop_limit) = self.hop_limit {
            TlvElement::new(tlv::TLV_HOP_LIMIT, Bytes::copy_from_slice(&[hop_limit]))
                .encode(&mut inner);
        }

        let mut wire = BytesMut::new();
        TlvElement::new(tlv::TLV_INTEREST, inner.freeze()).encode(&mut wire);
        wire.freeze()
    }

    pub fn from_wire(wire: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(wire);
        let outer = TlvElement::decode(&mut buf)?;
        Self::from_tlv(&outer)
    }

    pub fn from_tlv(outer: &TlvElement) -> Result<Self, Error> {
        if outer.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::Packet(format!(
                "Expected Interest TLV type {}, got {}",
                tlv::TLV_INTEREST,
                outer.tlv_type
            )));
        }

        let mut name = None;
        let mut nonce = None;
        let mut lifetime_ms = DEFAULT_INTEREST_LIFETIME_MS;
        let mut can_be_prefix = false;
        let mut must_be_fresh = false;
        let mut hop_limit = None;
        let mut forwarding_hint = Vec::new();

        let mut buf = outer.value.clone();
        while buf.has_remaining() {
            let element = TlvElement::decode(&mut buf)?;
            match element.tlv_type {
                tlv::TLV_NAME => name = Some(Name::from_tlv(&element)?),
                tlv::TLV_CAN_BE_PREFIX => can_be_prefix = true,
                tlv::TLV_MUST_BE_FRESH => must_be_fresh = true,
                tlv::TLV_FORWARDING_HINT => {
                    let mut hint = element.value.clone();
                    while hint.has_remaining() {
                        let delegation = TlvElement::decode(&mut hint)?;
                        forwarding_hint.push(Name::from_tlv(&delegation)?);
                    }
                }
                tlv::TLV_NONCE => {
                    if element.value.len() != 4 {
                        return Err(Error::Packet("Nonce must be 4 bytes".into()));
                    }
                    nonce = Some(u32::from_be_bytes([
                        element.value[0],
                        element.value[1],
                        element.value[2],
                        element.value[3],
                    ]));
                }
                tlv::TLV_INTEREST_LIFETIME => lifetime_ms = element.as_nonneg_integer()?,
                tlv::TLV_HOP_LIMIT => {
                    if element.value.len() != 1 {
                        return Err(Error::Packet("HopLimit must be 1 byte".into()));
                    }
                    hop_limit = Some(element.value[0]);
                }
                // Unrecognized fields (ApplicationParameters etc.) are carried
                // by producers and consumers, not interpreted by the forwarder.
                _ => {}
            }
        }

        let name = name.ok_or_else(|| Error::Packet("Interest is missing a Name".into()))?;
        let nonce = nonce.ok_or_else(|| Error::Packet("Interest is missing a Nonce".into()))?;

        Ok(Self {
            name,
            nonce,
            lifetime_ms,
            can_be_prefix,
            must_be_fresh,
            hop_limit,
            forwarding_hint,
        })
    }
}

/* ---------------------------------------------------------------- *\
 * Data
\* ---------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    pub freshness_ms: u64,
    /// Value of the SignatureInfo TLV, carried opaquely.
    pub signature_info: Bytes,
    /// Value of the SignatureValue TLV, carried opaquely.
    pub signature_value: Bytes,
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        // Stub DigestSha256 signature; the forwarder treats it as opaque.
        let mut sig_info = BytesMut::new();
        TlvElement::from_nonneg_integer(tlv::TLV_SIGNATURE_TYPE, 0).encode(&mut sig_info);

        Self {
            name,
            content: content.into(),
            freshness_ms: 0,
            signature_info: sig_info.freeze(),
            signature_value: Bytes::from_static(&[0u8; 32]),
        }
    }

    pub fn with_freshness_ms(mut self, freshness_ms: u64) -> Self {
        self.freshness_ms = freshness_ms;
        self
    }

    pub fn freshness_period(&self) -> Duration {
        Duration::from_millis(self.freshness_ms)
    }

    pub fn to_wire(&self) -> Bytes {
        let mut inner = BytesMut::new();
        self.name.to_tlv().encode(&mut inner);

        let mut meta = BytesMut::new();
        if self.freshness_ms > 0 {
            TlvElement::from_nonneg_integer(tlv::TLV_FRESHNESS_PERIOD, self.freshness_ms)
                .encode(&mut meta);
        }
        TlvElement::new(tlv::TLV_META_INFO, meta.freeze()).encode(&mut inner);

        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(&mut inner);
        TlvElement::new(tlv::TLV_SIGNATURE_INFO, self.signature_info.clone()).encode(&mut inner);
        TlvElement::new(tlv::TLV_SIGNATURE_VALUE, self.signature_value.clone()).encode(&mut inner);

        let mut wire = BytesMut::new();
        TlvElement::new(tlv::TLV_DATA, inner.freeze()).encode(&mut wire);
        wire.freeze()
    }

    pub fn from_wire(wire: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(wire);
        let outer = TlvElement::decode(&mut buf)?;
        Self::from_tlv(&outer)
    }

    pub fn from_tlv(outer: &TlvElement) -> Result<Self, Error> {
        if outer.tlv_type != tlv::TLV_DATA {
            return Err(Error::Packet(format!(
                "Expected Data TLV type {}, got {}",
                tlv::TLV_DATA,
                outer.tlv_type
            )));
        }

        let mut name = None;
        let mut content = Bytes::new();
        let mut freshness_ms = 0;
        let mut signature_info = Bytes::new();
        let mut signature_value = Bytes::new();

        let mut buf = outer.value.clone();
        while buf.has_remaining() {
            let element = TlvElement::decode(&mut buf)?;
            match element.tlv_type {
                tlv::TLV_NAME => name = Some(Name::from_tlv(&element)?),
                tlv::TLV_META_INFO => {
                    let mut meta = element.value.clone();
                    while meta.has_remaining() {
                        let field = TlvElement::decode(&mut meta)?;
                        if field.tlv_type == tlv::TLV_FRESHNESS_PERIOD {
                            freshness_ms = field.as_nonneg_integer()?;
                        }
                    }
                }
                tlv::TLV_CONTENT => content = element.value.clone(),
                tlv::TLV_SIGNATURE_INFO => signature_info = element.value.clone(),
                tlv::TLV_SIGNATURE_VALUE => signature_value = element.value.clone(),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| Error::Packet("Data is missing a Name".into()))?;

        Ok(Self {
            name,
            content,
            freshness_ms,
            signature_info,
            signature_value,
        })
    }

    /// The sha256 digest of the encoded packet, i.e. the value of the
    /// implicit digest component.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_wire());
        hasher.finalize().into()
    }

    /// The full name: the Data name with the implicit digest component
    /// appended. Interests naming a specific packet use this form.
    pub fn full_name(&self) -> Name {
        self.name
            .appending(NameComponent::implicit_digest(self.digest().to_vec()))
    }
}

/* ---------------------------------------------------------------- *\
 * Nack
\* ---------------------------------------------------------------- */

/// Reason code carried in a network Nack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NackReason {
    None,
    Congestion,
    Duplicate,
    NoRoute,
}

impl NackReason {
    pub fn code(self) -> u64 {
        match self {
            NackReason::None => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
        }
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            _ => NackReason::None,
        }
    }

    /// Compares severity for aggregation: a lower code (other than `None`)
    /// is considered less severe and is preferred when combining reasons.
    pub fn is_less_severe(self, other: NackReason) -> bool {
        if self == NackReason::None {
            return false;
        }
        if other == NackReason::None {
            return true;
        }
        self.code() < other.code()
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NackReason::None => write!(f, "None"),
            NackReason::Congestion => write!(f, "Congestion"),
            NackReason::Duplicate => write!(f, "Duplicate"),
            NackReason::NoRoute => write!(f, "NoRoute"),
        }
    }
}

/// A negative acknowledgement for a specific outgoing Interest.
///
/// On the wire a Nack is an Interest wrapped in a link-layer packet whose
/// Nack header carries the reason; this struct is the decoded pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nack {
    pub reason: NackReason,
    pub interest: Interest,
}

impl Nack {
    pub fn new(reason: NackReason, interest: Interest) -> Self {
        Self { reason, interest }
    }
}

/* ---------------------------------------------------------------- *\
 * Network packet dispatch
\* ---------------------------------------------------------------- */

/// A decoded network-layer packet.
#[derive(Debug, Clone)]
pub enum NdnPacket {
    Interest(Interest),
    Data(Data),
}

impl NdnPacket {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            NdnPacket::Interest(interest) => interest.to_wire(),
            NdnPacket::Data(data) => data.to_wire(),
        }
    }

    pub fn from_bytes(wire: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(wire);
        let outer = TlvElement::decode(&mut buf)?;
        match outer.tlv_type {
            tlv::TLV_INTEREST => Ok(NdnPacket::Interest(Interest::from_tlv(&outer)?)),
            tlv::TLV_DATA => Ok(NdnPacket::Data(Data::from_tlv(&outer)?)),
            other => Err(Error::Packet(format!(
                "Unrecognized network packet TLV type {}",
                other
            ))),
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            NdnPacket::Interest(interest) => &interest.name,
            NdnPacket::Data(data) => &data.name,
        }
    }
}
