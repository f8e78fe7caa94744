use super::protocol::{EnOceanEvent, EnOceanProtocol, Request};
use super::{RORG_RPS, TRANSPORT, common_command, packet_type};
use crate::codec::Packet;
use crate::link::{ErrorHandler, LinkError, LinkEvent, log_error};
use crate::network::Network;
use crate::parameters::Parameters;
use std::collections::BTreeMap;
use std::fmt;
use tokio::time::Instant;

/// Energy bow pressed.
const RPS_PRESSED: u8 = 0x10;

/// Last switch telegram seen from one sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchState {
    pub data: u8,
    pub status: u8,
    pub destination: Option<u32>,
    pub dbm: Option<i16>,
}

impl SwitchState {
    pub fn pressed(&self) -> bool {
        self.data & RPS_PRESSED != 0
    }

    /// Rocker action of the first button, 0..=7.
    pub fn button(&self) -> u8 {
        self.data >> 5
    }
}

/// Tracks switches by their 32 bit sender id. There are no actuator drivers,
/// so `set` always reports an unknown device.
pub struct EnOceanNetwork {
    protocol: EnOceanProtocol,
    switches: BTreeMap<u32, SwitchState>,
    base_id: Option<u32>,
    on_error: ErrorHandler,
}

impl fmt::Debug for EnOceanNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnOceanNetwork")
            .field("protocol", &self.protocol)
            .field("switches", &self.switches)
            .field("base_id", &self.base_id)
            .finish()
    }
}

impl EnOceanNetwork {
    pub fn new(protocol: EnOceanProtocol) -> Self {
        let mut network = Self {
            protocol,
            switches: BTreeMap::new(),
            base_id: None,
            on_error: Box::new(log_error),
        };
        network.protocol.submit(Request::read_id_base());
        network
    }

    pub fn with_error_handler(mut self, on_error: ErrorHandler) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn base_id(&self) -> Option<u32> {
        self.base_id
    }

    pub fn switch(&self, id: u32) -> Option<&SwitchState> {
        self.switches.get(&id)
    }

    pub fn protocol(&self) -> &EnOceanProtocol {
        &self.protocol
    }

    fn process(&mut self) {
        for event in self.protocol.take_events() {
            self.on_event(event);
        }
    }

    fn on_event(&mut self, event: EnOceanEvent) {
        match event {
            LinkEvent::Response { request, frame } | LinkEvent::Confirmation { request, frame } => {
                self.on_response(request, &frame)
            }
            LinkEvent::Unsolicited(packet) => self.on_unsolicited(&packet),
            LinkEvent::Failed { request, error } => {
                tracing::warn!(?request, "request dropped");
                (self.on_error)(TRANSPORT, &error);
            }
        }
    }

    fn on_response(&mut self, request: Request, packet: &Packet) {
        let Request::CommonCommand(code) = request;
        let Some((&result, data)) = packet.data.split_first() else {
            return;
        };
        if result != 0 {
            tracing::warn!(code, result, "common command failed");
            return;
        }
        if code == common_command::RD_IDBASE {
            if let [a, b, c, d, ..] = *data {
                let base_id = u32::from_be_bytes([a, b, c, d]);
                self.base_id = Some(base_id);
                tracing::info!(base_id = %format!("{base_id:08x}"), "gateway base id");
            }
            if let Some(remaining) = packet.optional.first() {
                tracing::info!(remaining, "base id writes left");
            }
        }
    }

    fn on_unsolicited(&mut self, packet: &Packet) {
        if packet.packet_type != packet_type::RADIO_ERP1 {
            tracing::debug!(packet_type = packet.packet_type, "unhandled packet");
            return;
        }
        // RORG, data, sender id, status
        let [RORG_RPS, data, a, b, c, d, status, ..] = *packet.data.as_slice() else {
            tracing::debug!("unhandled radio telegram");
            return;
        };
        let id = u32::from_be_bytes([a, b, c, d]);
        // subtelegram count, destination id, dBm, security level
        let (destination, dbm) = match *packet.optional.as_slice() {
            [_, d0, d1, d2, d3, dbm, ..] => (Some(u32::from_be_bytes([d0, d1, d2, d3])), Some(-i16::from(dbm))),
            _ => (None, None),
        };
        let state = SwitchState { data, status, destination, dbm };
        tracing::info!(
            sender = %format!("{id:08x}"),
            pressed = state.pressed(),
            button = state.button(),
            dbm = ?dbm,
            "switch telegram"
        );
        self.switches.insert(id, state);
    }
}

impl Network for EnOceanNetwork {
    fn transport(&self) -> &'static str {
        TRANSPORT
    }

    fn set(&mut self, _id: u32, _parameters: &Parameters) -> bool {
        false
    }

    fn get(&self, id: u32, parameters: &mut Parameters) -> bool {
        let Some(state) = self.switches.get(&id) else {
            return false;
        };
        parameters.insert("node.name", format!("{id:08x}"));
        parameters.set_state("state", state.pressed());
        parameters.set_byte("button", state.button());
        true
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
