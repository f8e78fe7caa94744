//! HTTP gateway for Z-Wave and EnOcean devices behind USB serial dongles.

pub mod codec;
pub mod config;
pub mod enocean;
pub mod link;
pub mod network;
pub mod parameters;
pub mod serial;
pub mod web;
pub mod zwave;

pub use network::{Network, NetworkHandle, NetworkRequest};
pub use parameters::Parameters;
