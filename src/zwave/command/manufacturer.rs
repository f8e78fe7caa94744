use crate::parameters::Parameters;
use crate::zwave::class::MANUFACTURER_SPECIFIC;
use crate::zwave::drivers;
use crate::zwave::node::{CommandHandler, Node, Sender};

pub const GET: u8 = 0x04;
pub const REPORT: u8 = 0x05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: u16,
    pub product: u16,
    pub id: u16,
}

/// `COMMAND_CLASS_MANUFACTURER_SPECIFIC`. A report matching a known driver
/// replaces the node's handlers with the driver's ones.
#[derive(Debug, Default)]
pub struct ManufacturerSpecific {
    identity: Option<Identity>,
}

impl ManufacturerSpecific {
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }
}

impl CommandHandler for ManufacturerSpecific {
    fn send_set(&mut self, _sender: &mut Sender<'_>, _parameters: &Parameters) {}

    fn send_get(&mut self, sender: &mut Sender<'_>) {
        sender.send(&[MANUFACTURER_SPECIFIC, GET]);
    }

    fn get(&self, parameters: &mut Parameters) {
        if let Some(identity) = self.identity {
            parameters.set_word("device.manufacturer", identity.manufacturer);
            parameters.set_word("device.product", identity.product);
            parameters.set_word("device.id", identity.id);
        }
    }

    fn on_command(&mut self, node: &mut Node, command: &[u8], sender: &mut Sender<'_>) {
        let [_, REPORT, m0, m1, p0, p1, i0, i1, ..] = *command else {
            return;
        };
        let identity = Identity {
            manufacturer: u16::from_be_bytes([m0, m1]),
            product: u16::from_be_bytes([p0, p1]),
            id: u16::from_be_bytes([i0, i1]),
        };
        self.identity = Some(identity);

        let Some(driver) = drivers::find(identity.manufacturer, identity.product) else {
            tracing::debug!(node = node.id, ?identity, "no driver for device");
            return;
        };
        tracing::info!(node = node.id, device = driver.name, "device identified");
        node.device_name = Some(driver.name.to_string());
        for (class, mut handler) in (driver.handlers)() {
            handler.send_get(sender);
            node.install(class, handler);
        }
    }
}
