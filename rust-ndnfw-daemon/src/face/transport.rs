//! Transport seam for faces.
//!
//! A transport moves already-encoded link-layer packets. Socket transports
//! live outside this crate; the forwarding plane only needs the send side,
//! the MTU, and the queue depth for congestion marking. Received packets
//! enter through the event loop, not through this trait.

use bytes::Bytes;
use rust_ndnfw_common::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub trait Transport: Send {
    fn local_uri(&self) -> &str;

    fn remote_uri(&self) -> &str;

    /// Maximum link packet size, or None for an unlimited link.
    fn mtu(&self) -> Option<usize>;

    /// Queues a packet for transmission.
    fn send(&mut self, packet: Bytes) -> Result<()>;

    /// Current depth of the send queue, in bytes.
    fn send_queue_length(&self) -> usize;
}

/* ---------------------------------------------------------------- *
 * Internal transport
 * ---------------------------------------------------------------- */

/// In-process transport: transmitted packets surface on a channel that the
/// local application end consumes. Used for `internal://` faces.
#[derive(Debug)]
pub struct InternalTransport {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl InternalTransport {
    /// Creates the forwarder-side transport and the application-side
    /// receiver for packets the forwarder sends.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for InternalTransport {
    fn local_uri(&self) -> &str {
        "internal://"
    }

    fn remote_uri(&self) -> &str {
        "internal://"
    }

    fn mtu(&self) -> Option<usize> {
        None
    }

    fn send(&mut self, packet: Bytes) -> Result<()> {
        self.tx
            .send(packet)
            .map_err(|_| Error::Face("internal peer is gone".into()))
    }

    fn send_queue_length(&self) -> usize {
        0
    }
}

/* ---------------------------------------------------------------- *
 * Dummy transport
 * ---------------------------------------------------------------- */

/// Transport that records transmitted packets for inspection. Used for
/// `dummy://` faces and throughout the test suite; the shared handles stay
/// valid after the transport is boxed into a face.
#[derive(Debug)]
pub struct DummyTransport {
    mtu: Option<usize>,
    sent: Arc<Mutex<Vec<Bytes>>>,
    queue_length: Arc<AtomicUsize>,
    fail_sends: Arc<AtomicBool>,
}

impl DummyTransport {
    pub fn new() -> Self {
        Self {
            mtu: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            queue_length: Arc::new(AtomicUsize::new(0)),
            fail_sends: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Handle to the packets sent so far.
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<Bytes>>> {
        Arc::clone(&self.sent)
    }

    /// Handle controlling the reported send queue depth.
    pub fn queue_length_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.queue_length)
    }

    /// Handle that makes subsequent sends fail when set.
    pub fn fail_sends_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_sends)
    }
}

impl Default for DummyTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DummyTransport {
    fn local_uri(&self) -> &str {
        "dummy://"
    }

    fn remote_uri(&self) -> &str {
        "dummy://"
    }

    fn mtu(&self) -> Option<usize> {
        self.mtu
    }

    fn send(&mut self, packet: Bytes) -> Result<()> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(Error::Face("dummy transport send failure".into()));
        }
        self.sent.lock().unwrap().push(packet);
        Ok(())
    }

    fn send_queue_length(&self) -> usize {
        self.queue_length.load(Ordering::Relaxed)
    }
}
