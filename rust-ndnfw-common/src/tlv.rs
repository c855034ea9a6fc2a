//! TLV (Type-Length-Value) encoding and decoding utilities.
//!
//! This module provides functions for encoding and decoding NDN TLV packets,
//! including the NDNLPv2 link-layer fields.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Network-layer TLV types
pub const TLV_INTEREST: u64 = 0x05;
pub const TLV_DATA: u64 = 0x06;
pub const TLV_NAME: u64 = 0x07;
pub const TLV_IMPLICIT_SHA256_DIGEST_COMPONENT: u64 = 0x01;
pub const TLV_GENERIC_NAME_COMPONENT: u64 = 0x08;
pub const TLV_CAN_BE_PREFIX: u64 = 0x21;
pub const TLV_MUST_BE_FRESH: u64 = 0x12;
pub const TLV_FORWARDING_HINT: u64 = 0x1e;
pub const TLV_NONCE: u64 = 0x0a;
pub const TLV_INTEREST_LIFETIME: u64 = 0x0c;
pub const TLV_HOP_LIMIT: u64 = 0x22;
pub const TLV_META_INFO: u64 = 0x14;
pub const TLV_CONTENT_TYPE: u64 = 0x18;
pub const TLV_FRESHNESS_PERIOD: u64 = 0x19;
pub const TLV_CONTENT: u64 = 0x15;
pub const TLV_SIGNATURE_INFO: u64 = 0x16;
pub const TLV_SIGNATURE_VALUE: u64 = 0x17;
pub const TLV_SIGNATURE_TYPE: u64 = 0x1b;

/// NDNLPv2 link-layer TLV types
pub const TLV_LP_PACKET: u64 = 0x64;
pub const TLV_LP_FRAGMENT: u64 = 0x50;
pub const TLV_LP_SEQUENCE: u64 = 0x51;
pub const TLV_LP_FRAG_INDEX: u64 = 0x52;
pub const TLV_LP_FRAG_COUNT: u64 = 0x53;
pub const TLV_LP_HOP_COUNT: u64 = 0x54;
pub const TLV_LP_NACK: u64 = 0x0320;
pub const TLV_LP_NACK_REASON: u64 = 0x0321;
pub const TLV_LP_CONGESTION_MARK: u64 = 0x0340;

/// Encodes a TLV variable-length number (used for both type and length).
///
/// Uses the standard NDN encoding:
/// - If the value < 253, uses 1 byte
/// - If the value <= 65535, uses 3 bytes (253 + 2 bytes)
/// - If the value <= 4294967295, uses 5 bytes (254 + 4 bytes)
/// - Otherwise, uses 9 bytes (255 + 8 bytes)
pub fn encode_var_number(buf: &mut BytesMut, value: u64) {
    if value < 253 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u8(253);
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u8(254);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(255);
        buf.put_u64(value);
    }
}

/// Decodes a TLV variable-length number.
pub fn decode_var_number(buf: &mut impl Buf) -> Result<u64, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("Buffer underflow when decoding TLV number".into()));
    }

    let first_byte = buf.get_u8();

    match first_byte {
        // Small value (< 253)
        0..=252 => Ok(first_byte as u64),

        // 16-bit value
        253 => {
            if buf.remaining() < 2 {
                return Err(Error::Tlv("Buffer underflow when decoding 16-bit TLV number".into()));
            }
            Ok(buf.get_u16() as u64)
        }

        // 32-bit value
        254 => {
            if buf.remaining() < 4 {
                return Err(Error::Tlv("Buffer underflow when decoding 32-bit TLV number".into()));
            }
            Ok(buf.get_u32() as u64)
        }

        // 64-bit value
        255 => {
            if buf.remaining() < 8 {
                return Err(Error::Tlv("Buffer underflow when decoding 64-bit TLV number".into()));
            }
            Ok(buf.get_u64())
        }
    }
}

/// Returns the number of bytes needed to encode the given number.
pub fn var_number_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Encodes a nonNegativeInteger TLV value (1, 2, 4, or 8 bytes).
pub fn encode_nonneg_integer(buf: &mut BytesMut, value: u64) {
    if value <= u8::MAX as u64 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u32(value as u32);
    } else {
        buf.put_u64(value);
    }
}

/// Decodes a nonNegativeInteger from a complete TLV value.
pub fn decode_nonneg_integer(value: &[u8]) -> Result<u64, Error> {
    match value.len() {
        1 => Ok(value[0] as u64),
        2 => Ok(u16::from_be_bytes([value[0], value[1]]) as u64),
        4 => Ok(u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as u64),
        8 => Ok(u64::from_be_bytes([
            value[0], value[1], value[2], value[3], value[4], value[5], value[6], value[7],
        ])),
        n => Err(Error::Tlv(format!("Invalid nonNegativeInteger length {}", n))),
    }
}

/// A generic TLV element consisting of a type, length, and value.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tlv_type: u64,
    pub value: Bytes,
}

impl TlvElement {
    /// Creates a new TLV element.
    pub fn new(tlv_type: u64, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Creates a TLV element holding a nonNegativeInteger value.
    pub fn from_nonneg_integer(tlv_type: u64, value: u64) -> Self {
        let mut buf = BytesMut::new();
        encode_nonneg_integer(&mut buf, value);
        Self::new(tlv_type, buf.freeze())
    }

    /// Interprets this element's value as a nonNegativeInteger.
    pub fn as_nonneg_integer(&self) -> Result<u64, Error> {
        decode_nonneg_integer(&self.value)
    }

    /// Returns the total length of this TLV element when encoded.
    pub fn len(&self) -> usize {
        let value_len = self.value.len();
        var_number_size(self.tlv_type) + var_number_size(value_len as u64) + value_len
    }

    /// Returns true when the element carries an empty value.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encodes this TLV element into the provided buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_var_number(buf, self.tlv_type);
        encode_var_number(buf, self.value.len() as u64);
        buf.extend_from_slice(&self.value);
    }

    /// Decodes a TLV element from the provided buffer.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        if buf.remaining() < 2 {
            return Err(Error::Tlv("Buffer too small for TLV".into()));
        }

        let tlv_type = decode_var_number(buf)?;
        let length = decode_var_number(buf)? as usize;

        if buf.remaining() < length {
            return Err(Error::Tlv(format!(
                "Buffer underflow: TLV value requires {} bytes but only {} available",
                length,
                buf.remaining()
            )));
        }

        Ok(Self {
            tlv_type,
            value: buf.copy_to_bytes(length),
        })
    }
}
