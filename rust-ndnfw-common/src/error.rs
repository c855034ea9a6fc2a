//! Error types for the NDNFW crates.

use thiserror::Error;

/// All possible errors that can occur within the NDNFW crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Error related to TLV encoding/decoding.
    #[error("TLV error: {0}")]
    Tlv(String),

    /// Error related to NDN packet processing.
    #[error("NDN packet error: {0}")]
    Packet(String),

    /// Error related to NDNLPv2 link-layer processing.
    #[error("link protocol error: {0}")]
    LinkProtocol(String),

    /// Error related to a face or its transport.
    #[error("face error: {0}")]
    Face(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}
