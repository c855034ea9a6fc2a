//! Async driver for the forwarder.
//!
//! Transports deliver received link packets into an ingress channel; the
//! event loop multiplexes that channel against the scheduler's next deadline,
//! so every table mutation happens on this one task.

use crate::face::{EndpointId, FaceId};
use crate::fw::forwarder::Forwarder;
use bytes::Bytes;
use log::debug;
use tokio::sync::mpsc;

/// A link packet received by a transport, addressed to its face.
#[derive(Debug, Clone)]
pub struct PacketIn {
    pub face: FaceId,
    pub endpoint: EndpointId,
    pub wire: Bytes,
}

pub struct EventLoop {
    forwarder: Forwarder,
    rx: mpsc::Receiver<PacketIn>,
}

impl EventLoop {
    /// Wraps the forwarder; the returned sender is handed to transports.
    pub fn new(forwarder: Forwarder) -> (Self, mpsc::Sender<PacketIn>) {
        let (tx, rx) = mpsc::channel(1024);
        (Self { forwarder, rx }, tx)
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    pub fn forwarder_mut(&mut self) -> &mut Forwarder {
        &mut self.forwarder
    }

    /// Runs until every ingress sender is dropped.
    pub async fn run(mut self) -> Forwarder {
        loop {
            self.forwarder.poll_timers();

            let deadline = self.forwarder.next_timer_deadline();
            tokio::select! {
                packet = self.rx.recv() => match packet {
                    Some(packet) => {
                        self.forwarder.on_receive(packet.face, packet.endpoint, &packet.wire);
                    }
                    None => {
                        debug!("ingress channel closed, stopping event loop");
                        break;
                    }
                },
                _ = async {
                    match deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {}
            }
        }
        self.forwarder
    }
}
