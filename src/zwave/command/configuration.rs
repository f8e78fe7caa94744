//! `COMMAND_CLASS_CONFIGURATION`: numbered device registers of 1, 2 or 4 bytes.

use crate::parameters::Parameters;
use crate::zwave::class::CONFIGURATION;
use crate::zwave::node::{CommandHandler, Node, Sender};
use std::collections::BTreeMap;

pub const SET: u8 = 0x04;
pub const GET: u8 = 0x05;
pub const REPORT: u8 = 0x06;

/// Register value; the variant is the register width on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValue {
    Byte(u8),
    Word(u16),
    Long(u32),
}

impl ConfigValue {
    pub fn size(self) -> u8 {
        match self {
            ConfigValue::Byte(_) => 1,
            ConfigValue::Word(_) => 2,
            ConfigValue::Long(_) => 4,
        }
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [b] => Some(ConfigValue::Byte(b)),
            [h, l] => Some(ConfigValue::Word(u16::from_be_bytes([h, l]))),
            [a, b, c, d] => Some(ConfigValue::Long(u32::from_be_bytes([a, b, c, d]))),
            _ => None,
        }
    }

    fn encode(self, out: &mut Vec<u8>) {
        match self {
            ConfigValue::Byte(v) => out.push(v),
            ConfigValue::Word(v) => out.extend_from_slice(&v.to_be_bytes()),
            ConfigValue::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        }
    }
}

/// Parses `[CONFIGURATION, REPORT, index, size, value...]`. Reports with an
/// unsupported size or a truncated value yield `None`.
pub fn parse_report(command: &[u8]) -> Option<(u8, ConfigValue)> {
    let [_, REPORT, index, size, value @ ..] = command else {
        return None;
    };
    let value = ConfigValue::decode(value.get(..usize::from(*size))?)?;
    Some((*index, value))
}

pub fn send_value(sender: &mut Sender<'_>, index: u8, value: ConfigValue) {
    let mut command = vec![CONFIGURATION, SET, index, value.size()];
    value.encode(&mut command);
    sender.send(&command);
}

pub fn send_get_register(sender: &mut Sender<'_>, index: u8) {
    sender.send(&[CONFIGURATION, GET, index]);
}

/// Generic handler. It knows nothing about the device, so it only tracks
/// registers the device has reported, exposed as `config.<index>`.
#[derive(Debug, Default)]
pub struct Configuration {
    registers: BTreeMap<u8, ConfigValue>,
}

fn key(index: u8) -> String {
    format!("config.{index}")
}

impl CommandHandler for Configuration {
    fn send_set(&mut self, sender: &mut Sender<'_>, parameters: &Parameters) {
        for (&index, value) in &self.registers {
            let name = key(index);
            let requested = match value {
                ConfigValue::Byte(_) => parameters.get_byte(&name).map(ConfigValue::Byte),
                ConfigValue::Word(_) => parameters.get_word(&name).map(ConfigValue::Word),
                ConfigValue::Long(_) => parameters.get_long(&name).map(ConfigValue::Long),
            };
            if let Some(requested) = requested {
                send_value(sender, index, requested);
                send_get_register(sender, index);
            }
        }
    }

    fn send_get(&mut self, sender: &mut Sender<'_>) {
        for &index in self.registers.keys() {
            send_get_register(sender, index);
        }
    }

    fn get(&self, parameters: &mut Parameters) {
        for (&index, value) in &self.registers {
            let name = key(index);
            match *value {
                ConfigValue::Byte(v) => parameters.set_byte(&name, v),
                ConfigValue::Word(v) => parameters.set_word(&name, v),
                ConfigValue::Long(v) => parameters.set_long(&name, v),
            }
        }
    }

    fn on_command(&mut self, node: &mut Node, command: &[u8], _sender: &mut Sender<'_>) {
        if let Some((index, value)) = parse_report(command) {
            tracing::debug!(node = node.id, index, ?value, "configuration report");
            self.registers.insert(index, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zwave::command::tests::sent;
    use crate::zwave::protocol::ZWaveProtocol;

    #[test]
    fn test_parse_report_widths() {
        assert_eq!(parse_report(&[CONFIGURATION, REPORT, 3, 1, 7]), Some((3, ConfigValue::Byte(7))));
        assert_eq!(
            parse_report(&[CONFIGURATION, REPORT, 12, 2, 0x00, 0x1e]),
            Some((12, ConfigValue::Word(30)))
        );
        assert_eq!(
            parse_report(&[CONFIGURATION, REPORT, 1, 4, 0x01, 0x02, 0x03, 0x04]),
            Some((1, ConfigValue::Long(0x0102_0304)))
        );
        // truncated, odd width, wrong command
        assert_eq!(parse_report(&[CONFIGURATION, REPORT, 12, 2, 0x00]), None);
        assert_eq!(parse_report(&[CONFIGURATION, REPORT, 12, 3, 0, 0, 0]), None);
        assert_eq!(parse_report(&[CONFIGURATION, SET, 12, 1, 0]), None);
    }

    #[tokio::test]
    async fn test_generic_registers_follow_reports() {
        let mut protocol = ZWaveProtocol::default();
        let mut node = Node::new(5);
        let mut config = Configuration::default();
        let mut sender = Sender::new(&mut protocol, 5);

        config.on_command(&mut node, &[CONFIGURATION, REPORT, 12, 2, 0x00, 0x1e], &mut sender);
        let mut parameters = Parameters::new();
        config.get(&mut parameters);
        assert_eq!(parameters.get("config.12"), Some("30"));

        // unknown registers are ignored, known ones keep their width
        config.send_set(
            &mut sender,
            &Parameters::from_iter([("config.12", "45"), ("config.13", "1")]),
        );
        config.send_get(&mut sender);
        assert_eq!(
            sent(&protocol),
            vec![
                vec![CONFIGURATION, SET, 12, 2, 0x00, 45],
                vec![CONFIGURATION, GET, 12],
                vec![CONFIGURATION, GET, 12],
            ]
        );
    }
}
