//! NDN names and name components.
//!
//! Names are ordered sequences of byte components. They support the prefix
//! relation, longest common prefix, and the canonical NDN ordering that the
//! content store relies on for sorted prefix lookup.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Maximum number of components in an NDN name accepted by the forwarder.
pub const MAX_NAME_COMPONENTS: usize = 32;

/// Length of an implicit sha256 digest component value.
pub const DIGEST_COMPONENT_LENGTH: usize = 32;

/// A single name component: a TLV type plus opaque bytes.
///
/// Almost all components are `GenericNameComponent`; the only other type the
/// forwarder interprets is `ImplicitSha256DigestComponent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent {
    pub typ: u64,
    pub value: Bytes,
}

impl NameComponent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            typ: tlv::TLV_GENERIC_NAME_COMPONENT,
            value: bytes.into(),
        }
    }

    pub fn implicit_digest(digest: impl Into<Bytes>) -> Self {
        Self {
            typ: tlv::TLV_IMPLICIT_SHA256_DIGEST_COMPONENT,
            value: digest.into(),
        }
    }

    pub fn is_implicit_digest(&self) -> bool {
        self.typ == tlv::TLV_IMPLICIT_SHA256_DIGEST_COMPONENT
            && self.value.len() == DIGEST_COMPONENT_LENGTH
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.value
    }

    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(self.typ, self.value.clone())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        match element.tlv_type {
            tlv::TLV_GENERIC_NAME_COMPONENT | tlv::TLV_IMPLICIT_SHA256_DIGEST_COMPONENT => {
                Ok(Self {
                    typ: element.tlv_type,
                    value: element.value.clone(),
                })
            }
            other => Err(Error::Packet(format!(
                "Unsupported name component TLV type {}",
                other
            ))),
        }
    }

    /// Canonical NDN component order: type, then length, then value bytes.
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.typ
            .cmp(&other.typ)
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_cmp(other)
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_implicit_digest() {
            write!(f, "sha256digest=")?;
            for &b in self.value.iter().take(8) {
                write!(f, "{:02x}", b)?;
            }
            return write!(f, "...");
        }
        let printable = self.value.iter().all(|&b| b.is_ascii_graphic() || b == b' ');
        if printable && !self.value.is_empty() {
            write!(f, "{}", String::from_utf8_lossy(&self.value))
        } else {
            write!(f, "0x")?;
            for &b in &self.value {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

/// A hierarchical NDN name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parses a name from its URI form, e.g. `/a/b/c`. Empty path segments
    /// are skipped, so `/` parses as the empty (root) name.
    pub fn from_string(s: &str) -> Self {
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(|comp| NameComponent::new(comp.as_bytes().to_vec()))
            .collect();
        Self { components }
    }

    pub fn push(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Returns the prefix consisting of the first `len` components.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// Returns a copy of this name with `component` appended.
    pub fn appending(&self, component: NameComponent) -> Self {
        let mut name = self.clone();
        name.push(component);
        name
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// Number of leading components shared with `other`.
    pub fn longest_common_prefix(&self, other: &Self) -> usize {
        self.components
            .iter()
            .zip(other.components.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        TlvElement::new(tlv::TLV_NAME, buf.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::Packet(format!(
                "Expected name TLV type {}, got {}",
                tlv::TLV_NAME,
                element.tlv_type
            )));
        }

        let mut components = Vec::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            components.push(NameComponent::from_tlv(&e)?);
        }
        Ok(Self { components })
    }
}

impl Ord for Name {
    /// Canonical NDN name order: componentwise, with a proper prefix sorting
    /// before any name it is a prefix of. This makes all names sharing a
    /// prefix form a contiguous range in a sorted container.
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}
