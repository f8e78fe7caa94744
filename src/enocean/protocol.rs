//! Link engine for ESP3.
//!
//! There is no acknowledgement layer: a request is complete when the next
//! RESPONSE packet arrives and is retransmitted when none arrives in time.
//! Corrupt input drops the whole receive buffer.

use super::{common_command, packet_type};
use crate::codec::{Decoded, EnOceanCodec, FrameCodec, Packet};
use crate::link::{ACK_TIMEOUT, LinkError, LinkEvent, RequestQueue, Retry, Waiting};
use std::time::Duration;
use tokio::time::Instant;

pub type EnOceanEvent = LinkEvent<Request, Packet>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Common command with a one byte code, e.g. `CO_RD_IDBASE`.
    CommonCommand(u8),
}

impl Request {
    pub fn read_id_base() -> Self {
        Request::CommonCommand(common_command::RD_IDBASE)
    }

    pub fn to_packet(self) -> Packet {
        match self {
            Request::CommonCommand(code) => Packet::new(packet_type::COMMON_COMMAND, vec![code], Vec::new()),
        }
    }
}

#[derive(Debug)]
pub struct EnOceanProtocol {
    codec: EnOceanCodec,
    queue: RequestQueue<Request>,
    rx: Vec<u8>,
    tx: Vec<u8>,
    events: Vec<EnOceanEvent>,
    response_timeout: Duration,
}

impl Default for EnOceanProtocol {
    fn default() -> Self {
        Self::new(ACK_TIMEOUT)
    }
}

impl EnOceanProtocol {
    pub fn new(response_timeout: Duration) -> Self {
        Self {
            codec: EnOceanCodec,
            queue: RequestQueue::new(),
            rx: Vec::with_capacity(512),
            tx: Vec::new(),
            events: Vec::new(),
            response_timeout,
        }
    }

    pub fn submit(&mut self, request: Request) {
        tracing::debug!(?request, "queue request");
        if self.queue.push(request) {
            self.transmit();
        }
    }

    pub fn receive(&mut self, bytes: &[u8]) {
        self.rx.extend_from_slice(bytes);
        loop {
            let step = self.codec.decode(&self.rx);
            let consumed = step.consumed();
            match step {
                Decoded::NeedMore => break,
                Decoded::Corrupt(n) => tracing::warn!(bytes = n, "enocean rx corrupt, dropping buffer"),
                Decoded::Discard(n) | Decoded::Unsupported(n) => tracing::trace!(bytes = n, "enocean rx skip"),
                Decoded::Control(control) => tracing::debug!(?control, "unexpected control symbol"),
                Decoded::Frame(packet, _) => {
                    tracing::trace!(?packet, "enocean rx");
                    self.on_packet(packet);
                }
            }
            self.rx.drain(..consumed);
        }
    }

    pub fn on_timeout(&mut self) {
        if self.queue.waiting() == Waiting::Idle {
            return;
        }
        self.queue.disarm();
        match self.queue.retry() {
            Some(Retry::Resend) => {
                tracing::warn!(attempt = self.queue.attempts() + 1, "no response, resending request");
                self.transmit();
            }
            Some(Retry::Exhausted(request)) => {
                self.events.push(LinkEvent::Failed { request, error: LinkError::Timeout });
                self.transmit();
            }
            None => {}
        }
    }

    pub fn close(&mut self) {
        for request in self.queue.drain() {
            self.events.push(LinkEvent::Failed { request, error: LinkError::Closed });
        }
        self.rx.clear();
        self.tx.clear();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.queue.deadline()
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn take_events(&mut self) -> Vec<EnOceanEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Request> {
        self.queue.iter()
    }

    fn transmit(&mut self) {
        while let Some(&request) = self.queue.front() {
            match self.codec.encode(&request.to_packet()) {
                Ok(bytes) => {
                    tracing::trace!("enocean tx {:02x?}", bytes);
                    self.tx.extend_from_slice(&bytes);
                    self.queue.arm(Waiting::Transmission, self.response_timeout);
                    return;
                }
                Err(e) => {
                    self.queue.pop();
                    self.events.push(LinkEvent::Failed { request, error: e.into() });
                }
            }
        }
    }

    fn on_packet(&mut self, packet: Packet) {
        if packet.packet_type == packet_type::RESPONSE {
            if let Some(request) = self.queue.pop() {
                self.events.push(LinkEvent::Response { request, frame: packet });
                self.transmit();
                return;
            }
        }
        self.events.push(LinkEvent::Unsolicited(packet));
    }
}
