//! EnOcean network reached through an ESP3 USB gateway (USB 300 and alike).

pub mod network;
pub mod protocol;

pub use network::EnOceanNetwork;
pub use protocol::{EnOceanProtocol, Request};

/// ESP3 packet types.
pub mod packet_type {
    pub const RADIO_ERP1: u8 = 0x01;
    pub const RESPONSE: u8 = 0x02;
    pub const COMMON_COMMAND: u8 = 0x05;
}

/// Common command codes.
pub mod common_command {
    /// Read the base id range of the gateway.
    pub const RD_IDBASE: u8 = 0x08;
}

/// Radio telegram choice byte for repeated switch communication.
pub const RORG_RPS: u8 = 0xf6;

pub const TRANSPORT: &str = "enocean";
