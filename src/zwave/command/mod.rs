//! Generic command class handlers, installed from a node's class list.

pub mod basic;
pub mod configuration;
pub mod manufacturer;

pub use basic::Basic;
pub use configuration::{ConfigValue, Configuration};
pub use manufacturer::ManufacturerSpecific;

use super::class;
use super::node::CommandHandler;

/// Generic handler for `class`, if there is one.
pub fn generic_handler(class: u8) -> Option<Box<dyn CommandHandler>> {
    match class {
        class::BASIC => Some(Box::new(Basic::default())),
        class::CONFIGURATION => Some(Box::new(Configuration::default())),
        class::MANUFACTURER_SPECIFIC => Some(Box::new(ManufacturerSpecific::default())),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::zwave::protocol::{Request, ZWaveProtocol};

    /// Commands of all queued `SendData` requests, in queue order.
    pub(crate) fn sent(protocol: &ZWaveProtocol) -> Vec<Vec<u8>> {
        protocol
            .pending()
            .filter_map(|request| match request {
                Request::SendData(data) => Some(data.command.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_generic_handler_lookup() {
        assert!(generic_handler(class::BASIC).is_some());
        assert!(generic_handler(class::CONFIGURATION).is_some());
        assert!(generic_handler(class::MANUFACTURER_SPECIFIC).is_some());
        assert!(generic_handler(class::MANUFACTURER_PROPRIETARY).is_none());
        assert!(generic_handler(0x86).is_none());
    }
}
