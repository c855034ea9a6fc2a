//! Common types and codecs for the NDNFW forwarding daemon.
//!
//! This crate provides the packet-level building blocks shared by the
//! forwarding plane and its clients: names, the TLV codec, the network-layer
//! Interest/Data/Nack packets, and the NDNLPv2 link-layer packet.

pub mod error;
pub mod lp;
pub mod metrics;
pub mod name;
pub mod packet;
pub mod tlv;

/// Reexport of common types
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
