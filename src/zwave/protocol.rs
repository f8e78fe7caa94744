//! Link engine for the Z-Wave serial API.
//!
//! Every data frame from the controller is acknowledged with ACK, every
//! corrupt one with NACK. Requests are sent one at a time; the head request
//! is retransmitted on NACK, CAN or a missing ACK until [`MAX_ATTEMPTS`] is
//! reached.
//!
//! `SendData` requests are completed in two steps: a RESPONSE frame tells
//! that the controller accepted the command, and a later REQUEST frame with
//! the same function and the request's `func_id` reports the radio transmit
//! status. Only the second one releases the queue.

use super::{function, transmit};
use crate::codec::zwave::{ACK, NACK};
use crate::codec::{Control, DataFrame, Decoded, FrameCodec, FrameType, ZWaveCodec};
use crate::link::{
    LinkError, LinkEvent, MAX_ATTEMPTS, RequestQueue, Retry, Waiting, ACK_TIMEOUT,
};
use std::time::Duration;
use tokio::time::Instant;

/// Default time to wait for the response or transmit status after ACK.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(5000);

pub type ZWaveEvent = LinkEvent<Request, DataFrame>;

/// Data for one node, wrapped into `ZW_SEND_DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendData {
    pub node: u8,
    pub command: Vec<u8>,
    pub tx_options: u8,
    /// Correlation id, assigned on first transmission and kept for resends.
    pub func_id: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `SERIAL_API_GET_INIT_DATA`: bitmap of all nodes in the network.
    DiscoverNodes,
    /// `ZW_GET_NODE_PROTOCOL_INFO`: device classes of one node.
    GetNodeInfo { node: u8 },
    /// `ZW_REQUEST_NODE_INFO`: make a node send its node information frame.
    RequestNodeInfo { node: u8 },
    SendData(SendData),
}

impl Request {
    pub fn send_data(node: u8, command: &[u8]) -> Self {
        Request::SendData(SendData {
            node,
            command: command.to_vec(),
            tx_options: transmit::DEFAULT,
            func_id: None,
        })
    }

    pub fn function(&self) -> u8 {
        match self {
            Request::DiscoverNodes => function::SERIAL_API_GET_INIT_DATA,
            Request::GetNodeInfo { .. } => function::GET_NODE_PROTOCOL_INFO,
            Request::RequestNodeInfo { .. } => function::REQUEST_NODE_INFO,
            Request::SendData(_) => function::SEND_DATA,
        }
    }

    /// Writes the payload following the function byte. The correlation id of
    /// a `SendData` request is appended by the engine.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Request::DiscoverNodes => {}
            Request::GetNodeInfo { node } | Request::RequestNodeInfo { node } => out.push(*node),
            Request::SendData(data) => {
                out.push(data.node);
                out.push(data.command.len() as u8);
                out.extend_from_slice(&data.command);
                out.push(data.tx_options);
            }
        }
    }

    pub fn func_id(&self) -> Option<u8> {
        match self {
            Request::SendData(data) => data.func_id,
            _ => None,
        }
    }

    pub fn awaits_confirmation(&self) -> bool {
        matches!(self, Request::SendData(_))
    }

    pub fn node(&self) -> Option<u8> {
        match self {
            Request::DiscoverNodes => None,
            Request::GetNodeInfo { node } | Request::RequestNodeInfo { node } => Some(*node),
            Request::SendData(data) => Some(data.node),
        }
    }
}

enum Match {
    Response,
    Confirmation,
    Unrelated,
}

fn classify(head: &Request, frame: &DataFrame) -> Match {
    if frame.function != head.function() {
        return Match::Unrelated;
    }
    match (frame.frame_type, head.func_id()) {
        (FrameType::Response, _) => Match::Response,
        (FrameType::Request, Some(id)) if frame.payload.first() == Some(&id) => Match::Confirmation,
        _ => Match::Unrelated,
    }
}

// 0 is never used as a correlation id
fn advance(counter: &mut u8) -> u8 {
    let id = *counter;
    *counter = if id == u8::MAX { 1 } else { id + 1 };
    id
}

#[derive(Debug)]
pub struct ZWaveProtocol {
    codec: ZWaveCodec,
    queue: RequestQueue<Request>,
    rx: Vec<u8>,
    tx: Vec<u8>,
    events: Vec<ZWaveEvent>,
    next_func_id: u8,
    ack_timeout: Duration,
    response_timeout: Duration,
}

impl Default for ZWaveProtocol {
    fn default() -> Self {
        Self::new(ACK_TIMEOUT, RESPONSE_TIMEOUT)
    }
}

impl ZWaveProtocol {
    pub fn new(ack_timeout: Duration, response_timeout: Duration) -> Self {
        Self {
            codec: ZWaveCodec,
            queue: RequestQueue::new(),
            rx: Vec::with_capacity(256),
            tx: Vec::new(),
            events: Vec::new(),
            next_func_id: 1,
            ack_timeout,
            response_timeout,
        }
    }

    /// Queues a request and transmits it right away if the link is idle.
    pub fn submit(&mut self, request: Request) {
        tracing::debug!(function = request.function(), node = ?request.node(), "queue request");
        if self.queue.push(request) {
            self.transmit();
        }
    }

    /// Feeds bytes read from the serial port.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.rx.extend_from_slice(bytes);
        loop {
            let step = self.codec.decode(&self.rx);
            let consumed = step.consumed();
            match step {
                Decoded::NeedMore => break,
                Decoded::Discard(n) => tracing::trace!(bytes = n, "zwave rx skip"),
                Decoded::Corrupt(n) => {
                    tracing::warn!(bytes = n, "zwave rx checksum error, sending NACK");
                    self.tx.push(NACK);
                }
                Decoded::Unsupported(n) => {
                    tracing::debug!(bytes = n, "zwave rx unknown frame type, acknowledged");
                    self.tx.push(ACK);
                }
                Decoded::Control(control) => self.on_control(control),
                Decoded::Frame(frame, _) => {
                    tracing::trace!(?frame, "zwave rx");
                    self.tx.push(ACK);
                    self.on_frame(frame);
                }
            }
            self.rx.drain(..consumed);
        }
    }

    /// Called when [`ZWaveProtocol::deadline`] has passed.
    pub fn on_timeout(&mut self) {
        match self.queue.waiting() {
            Waiting::Idle => {}
            Waiting::Transmission => self.resend(LinkError::Timeout),
            Waiting::Completion => {
                if let Some(request) = self.queue.pop() {
                    tracing::warn!(function = request.function(), node = ?request.node(), "no completion after ACK");
                    self.events.push(LinkEvent::Failed { request, error: LinkError::Timeout });
                    self.transmit();
                }
            }
        }
    }

    /// Fails every queued request with [`LinkError::Closed`].
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

    /// Bytes that must be written to the serial port.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn take_events(&mut self) -> Vec<ZWaveEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Request> {
        self.queue.iter()
    }

    fn transmit(&mut self) {
        while let Some(request) = self.queue.front_mut() {
            let mut payload = Vec::new();
            request.encode(&mut payload);
            if let Request::SendData(data) = request {
                let id = *data.func_id.get_or_insert_with(|| advance(&mut self.next_func_id));
                payload.push(id);
            }
            let frame = DataFrame::request(request.function(), payload);
            match self.codec.encode(&frame) {
                Ok(bytes) => {
                    tracing::trace!(
                        function = frame.function,
                        attempt = self.queue.attempts() + 1,
                        "zwave tx {:02x?}",
                        bytes
                    );
                    self.tx.extend_from_slice(&bytes);
                    self.queue.arm(Waiting::Transmission, self.ack_timeout);
                    return;
                }
                Err(e) => {
                    if let Some(request) = self.queue.pop() {
                        self.events.push(LinkEvent::Failed { request, error: e.into() });
                    }
                }
            }
        }
    }

    fn resend(&mut self, error: LinkError) {
        self.queue.disarm();
        match self.queue.retry() {
            Some(Retry::Resend) => {
                tracing::warn!(attempt = self.queue.attempts() + 1, max = MAX_ATTEMPTS, %error, "resending request");
                self.transmit();
            }
            Some(Retry::Exhausted(request)) => {
                self.events.push(LinkEvent::Failed { request, error });
                self.transmit();
            }
            None => {}
        }
    }

    fn on_control(&mut self, control: Control) {
        tracing::trace!(?control, "zwave rx");
        if self.queue.waiting() != Waiting::Transmission {
            return;
        }
        match control {
            Control::Ack => {
                self.queue.reset_attempts();
                self.queue.arm(Waiting::Completion, self.response_timeout);
            }
            Control::Nack | Control::Can => self.resend(LinkError::Nack),
        }
    }

    fn on_frame(&mut self, frame: DataFrame) {
        let Some(head) = self.queue.front() else {
            self.events.push(LinkEvent::Unsolicited(frame));
            return;
        };
        match classify(head, &frame) {
            Match::Response if head.awaits_confirmation() => {
                let request = head.clone();
                // a lost ACK is implied by the response
                self.queue.reset_attempts();
                self.queue.arm(Waiting::Completion, self.response_timeout);
                self.events.push(LinkEvent::Response { request, frame });
            }
            Match::Response => {
                if let Some(request) = self.queue.pop() {
                    self.events.push(LinkEvent::Response { request, frame });
                    self.transmit();
                }
            }
            Match::Confirmation => {
                if let Some(request) = self.queue.pop() {
                    self.events.push(LinkEvent::Confirmation { request, frame });
                    self.transmit();
                }
            }
            Match::Unrelated => self.events.push(LinkEvent::Unsolicited(frame)),
        }
    }
}
