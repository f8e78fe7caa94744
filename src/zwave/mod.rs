//! Z-Wave network reached through a serial API controller (UZB1 and alike).

pub mod command;
pub mod drivers;
pub mod network;
pub mod node;
pub mod protocol;

pub use network::ZWaveNetwork;
pub use node::{CommandHandler, Node, Sender};
pub use protocol::{Request, SendData, ZWaveProtocol};

/// Serial API function codes.
pub mod function {
    /// Controller version, capabilities and node bitmap.
    pub const SERIAL_API_GET_INIT_DATA: u8 = 0x02;
    /// A node sent a command to the controller.
    pub const APPLICATION_COMMAND_HANDLER: u8 = 0x04;
    pub const SEND_DATA: u8 = 0x13;
    /// Device classes of a node, without its command classes.
    pub const GET_NODE_PROTOCOL_INFO: u8 = 0x41;
    /// Node information frame (device classes and command classes).
    pub const APPLICATION_UPDATE: u8 = 0x49;
    /// Ask a node to send its node information frame.
    pub const REQUEST_NODE_INFO: u8 = 0x60;
}

/// Command class identifiers.
pub mod class {
    pub const BASIC: u8 = 0x20;
    pub const SWITCH_BINARY: u8 = 0x25;
    pub const SWITCH_MULTILEVEL: u8 = 0x26;
    pub const CONFIGURATION: u8 = 0x70;
    pub const MANUFACTURER_SPECIFIC: u8 = 0x72;
    pub const MANUFACTURER_PROPRIETARY: u8 = 0x91;
    /// Separates supported from controlled classes in a node information frame.
    pub const MARK: u8 = 0xef;
}

/// Generic device classes.
pub mod generic {
    pub const GENERIC_CONTROLLER: u8 = 0x01;
    pub const STATIC_CONTROLLER: u8 = 0x02;
    pub const SWITCH_BINARY: u8 = 0x10;
    pub const SWITCH_MULTILEVEL: u8 = 0x11;
}

/// Transmit options appended to every SendData request.
pub mod transmit {
    pub const ACK: u8 = 0x01;
    pub const AUTO_ROUTE: u8 = 0x04;
    pub const DEFAULT: u8 = ACK | AUTO_ROUTE;

    /// Transmit status reported in the SendData callback.
    pub const COMPLETE_OK: u8 = 0x00;
}

/// Application update status codes.
pub mod update {
    pub const NODE_INFO_RECEIVED: u8 = 0x84;
    pub const NODE_INFO_REQ_FAILED: u8 = 0x81;
}

pub const TRANSPORT: &str = "zwave";
