//! Node registry and discovery on top of [`ZWaveProtocol`].

use super::command::{Basic, Configuration, ManufacturerSpecific, generic_handler};
use super::node::{Node, NodeTable, Sender};
use super::protocol::{Request, ZWaveEvent, ZWaveProtocol};
use super::{TRANSPORT, class, function, generic, transmit, update};
use crate::codec::{DataFrame, FrameType};
use crate::link::{ErrorHandler, LinkError, LinkEvent, log_error};
use crate::network::Network;
use crate::parameters::Parameters;
use std::fmt;
use tokio::time::Instant;

/// Id of the USB controller itself unless configured otherwise.
pub const CONTROLLER_ID: u8 = 1;

/// Node ids present in a `SERIAL_API_GET_INIT_DATA` bitmap. Byte `i` covers
/// nodes `8i+1..=8i+8`, least significant bit first.
pub fn node_ids(bitmap: &[u8]) -> impl Iterator<Item = u8> + '_ {
    bitmap.iter().enumerate().flat_map(|(index, &bits)| {
        (0..8)
            .filter(move |&bit| bits & (1u8 << bit) != 0)
            .filter_map(move |bit| u8::try_from(index * 8 + bit + 1).ok())
    })
}

pub struct ZWaveNetwork {
    protocol: ZWaveProtocol,
    nodes: NodeTable,
    controller_id: u8,
    on_error: ErrorHandler,
}

impl fmt::Debug for ZWaveNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZWaveNetwork")
            .field("protocol", &self.protocol)
            .field("controller_id", &self.controller_id)
            .field("nodes", &self.nodes.discovered().count())
            .finish()
    }
}

impl ZWaveNetwork {
    /// Creates the network and starts discovery.
    pub fn new(protocol: ZWaveProtocol, controller_id: u8) -> Self {
        let mut network = Self {
            protocol,
            nodes: NodeTable::default(),
            controller_id,
            on_error: Box::new(log_error),
        };
        network.protocol.submit(Request::DiscoverNodes);
        network
    }

    pub fn with_error_handler(mut self, on_error: ErrorHandler) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn node(&self, id: u8) -> &Node {
        self.nodes.node(id)
    }

    pub fn protocol(&self) -> &ZWaveProtocol {
        &self.protocol
    }

    // Handlers may queue requests, which can fail right away and produce
    // further events, so keep going until the engine is quiet.
    fn process(&mut self) {
        loop {
            let events = self.protocol.take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.on_event(event);
            }
        }
    }

    fn on_event(&mut self, event: ZWaveEvent) {
        match event {
            LinkEvent::Response { request, frame } => self.on_response(request, &frame.payload),
            LinkEvent::Confirmation { request, frame } => {
                let node = request.node();
                match frame.payload.get(1) {
                    Some(&transmit::COMPLETE_OK) => tracing::trace!(?node, "transmission complete"),
                    status => tracing::warn!(?node, ?status, "transmission failed"),
                }
            }
            LinkEvent::Unsolicited(frame) => self.on_unsolicited(frame),
            LinkEvent::Failed { request, error } => {
                tracing::warn!(function = request.function(), node = ?request.node(), "request dropped");
                (self.on_error)(TRANSPORT, &error);
            }
        }
    }

    fn on_response(&mut self, request: Request, payload: &[u8]) {
        match request {
            Request::DiscoverNodes => self.on_node_list(payload),
            Request::GetNodeInfo { node } => self.on_node_info(node, payload),
            Request::RequestNodeInfo { node } => {
                if payload.first() == Some(&0) {
                    tracing::warn!(node, "controller rejected node info request");
                }
            }
            Request::SendData(data) => {
                if payload.first() != Some(&1) {
                    tracing::warn!(node = data.node, "controller did not accept data for transmission");
                }
            }
        }
    }

    fn on_node_list(&mut self, payload: &[u8]) {
        // version, capabilities, bitmap length, bitmap
        let [version, _, count, bitmap @ ..] = payload else {
            tracing::warn!(len = payload.len(), "short node list");
            return;
        };
        let bitmap = &bitmap[..bitmap.len().min(usize::from(*count))];
        tracing::info!(version, "controller reported node list");
        for id in node_ids(bitmap) {
            if id != self.controller_id {
                tracing::debug!(node = id, "found node");
                self.protocol.submit(Request::GetNodeInfo { node: id });
            }
        }
    }

    fn on_node_info(&mut self, id: u8, payload: &[u8]) {
        // capability, security, reserved, basic, generic, specific
        let Some(&generic_class) = payload.get(4) else {
            tracing::warn!(node = id, "short node info");
            return;
        };
        let node = self.nodes.node_mut(id);
        node.name = id.to_string();
        let controller = match generic_class {
            generic::GENERIC_CONTROLLER | generic::STATIC_CONTROLLER => {
                tracing::info!(node = id, "controller");
                true
            }
            generic::SWITCH_MULTILEVEL => {
                tracing::info!(node = id, "multilevel switch");
                node.install_default(class::CONFIGURATION, Box::new(Configuration::default()));
                node.install_default(class::MANUFACTURER_SPECIFIC, Box::new(ManufacturerSpecific::default()));
                false
            }
            generic::SWITCH_BINARY => {
                tracing::info!(node = id, "binary switch");
                node.install_default(class::BASIC, Box::new(Basic::default()));
                false
            }
            other => {
                tracing::info!(node = id, generic = other, "unknown device class");
                false
            }
        };

        let mut sender = Sender::new(&mut self.protocol, id);
        node.send_get(&mut sender);
        if !controller {
            self.protocol.submit(Request::RequestNodeInfo { node: id });
        }
    }

    fn on_unsolicited(&mut self, frame: DataFrame) {
        if frame.frame_type != FrameType::Request {
            tracing::debug!(function = frame.function, "ignoring unexpected response");
            return;
        }
        match frame.function {
            function::APPLICATION_COMMAND_HANDLER => self.on_application_command(&frame.payload),
            function::APPLICATION_UPDATE => self.on_application_update(&frame.payload),
            other => tracing::debug!(function = other, "unhandled request from controller"),
        }
    }

    fn on_application_command(&mut self, payload: &[u8]) {
        // rx status, source node, command length, command
        let [_, source, len, command @ ..] = payload else {
            return;
        };
        let Some(command) = command.get(..usize::from(*len)).filter(|c| !c.is_empty()) else {
            tracing::warn!(node = source, "truncated application command");
            return;
        };
        tracing::trace!(node = source, "command {:02x?}", command);
        let node = self.nodes.node_mut(*source);
        let mut sender = Sender::new(&mut self.protocol, *source);
        node.dispatch(command, &mut sender);
    }

    fn on_application_update(&mut self, payload: &[u8]) {
        let [status, id, rest @ ..] = payload else {
            return;
        };
        match *status {
            update::NODE_INFO_RECEIVED => {
                // length, basic, generic, specific, command classes
                let [len, _basic, generic_class, _specific, classes @ ..] = rest else {
                    tracing::warn!(node = id, "short node information frame");
                    return;
                };
                let count = usize::from(*len).saturating_sub(3).min(classes.len());
                let supported: Vec<u8> =
                    classes[..count].iter().copied().take_while(|&c| c != class::MARK).collect();
                self.update_node(*id, *generic_class, &supported);
            }
            update::NODE_INFO_REQ_FAILED => tracing::warn!(node = id, "node information request failed"),
            other => tracing::debug!(node = id, status = other, "application update"),
        }
    }

    /// Installs generic handlers for the classes a node reported and asks it
    /// for its current state.
    fn update_node(&mut self, id: u8, generic_class: u8, classes: &[u8]) {
        tracing::info!(node = id, generic = generic_class, "node information received");
        let node = self.nodes.node_mut(id);
        node.name = id.to_string();
        for &command_class in classes {
            if let Some(handler) = generic_handler(command_class) {
                node.install_default(command_class, handler);
            }
        }
        let mut sender = Sender::new(&mut self.protocol, id);
        node.send_get(&mut sender);
    }
}

impl Network for ZWaveNetwork {
    fn transport(&self) -> &'static str {
        TRANSPORT
    }

    fn set(&mut self, id: u32, parameters: &Parameters) -> bool {
        let Some(node) = self.nodes.lookup_mut(id).filter(|node| node.is_discovered()) else {
            return false;
        };
        let mut sender = Sender::new(&mut self.protocol, node.id);
        node.send_set(&mut sender, parameters);
        self.process();
        true
    }

    fn get(&self, id: u32, parameters: &mut Parameters) -> bool {
        let Some(node) = self.nodes.lookup(id) else {
            return false;
        };
        node.get(parameters);
        node.is_discovered()
    }

    fn receive(&mut self, bytes: &[u8]) {
        self.protocol.receive(bytes);
        self.process();
    }

    fn on_timeout(&mut self) {
        self.protocol.on_timeout();
        self.process();
    }

    fn deadline(&self) -> Option<Instant> {
        self.protocol.deadline()
    }

    fn take_output(&mut self) -> Vec<u8> {
        self.protocol.take_output()
    }

    fn on_transport_error(&mut self, error: &LinkError) {
        (self.on_error)(TRANSPORT, error);
    }

    fn close(&mut self) {
        self.protocol.close();
        self.process();
    }
}
