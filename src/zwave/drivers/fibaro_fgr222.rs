//! Fibaro FGR-222 roller shutter with venetian blind mode.
//!
//! Position is set and reported through a proprietary command (the same byte
//! sequence FHEM uses); the slat turning time lives in configuration register 12.

use crate::parameters::Parameters;
use crate::zwave::class::{CONFIGURATION, MANUFACTURER_PROPRIETARY};
use crate::zwave::command::configuration::{self, ConfigValue};
use crate::zwave::node::{CommandHandler, Node, Sender};

/// Configuration register: time for a full slat turn, in 10 ms units.
pub const SLAT_TIME: u8 = 12;
/// Configuration register: writing 1 starts calibration.
pub const CALIBRATE: u8 = 29;

const HEADER: [u8; 4] = [MANUFACTURER_PROPRIETARY, 0x01, 0x0f, 0x26];
const SET_POSITION: u8 = 0x01;
const GET_POSITION: u8 = 0x02;
const REPORT_POSITION: u8 = 0x03;

const BLINDS: u8 = 0x02;
const SLAT: u8 = 0x01;

pub fn handlers() -> Vec<(u8, Box<dyn CommandHandler>)> {
    vec![
        (CONFIGURATION, Box::new(Fgr222Config::default()) as Box<dyn CommandHandler>),
        (MANUFACTURER_PROPRIETARY, Box::new(Fgr222::default()) as Box<dyn CommandHandler>),
    ]
}

#[derive(Debug, Default)]
pub struct Fgr222 {
    blinds: u8,
    slat: u8,
}

impl CommandHandler for Fgr222 {
    fn send_set(&mut self, sender: &mut Sender<'_>, parameters: &Parameters) {
        let mut blinds = parameters.get_percentage("position.blinds");
        let slat = parameters.get_percentage("position.slat");

        // the device ignores the slat angle when asked to close the blinds
        // completely, so stop just short of it
        if blinds == Some(0) && slat.is_some_and(|s| s > 0) {
            blinds = Some(1);
        }

        let mut flags = 0;
        if blinds.is_some() {
            flags |= BLINDS;
        }
        if slat.is_some() {
            flags |= SLAT;
        }
        if flags == 0 {
            return;
        }
        let mut command = HEADER.to_vec();
        command.extend_from_slice(&[
            SET_POSITION,
            flags,
            blinds.unwrap_or(self.blinds),
            slat.unwrap_or(self.slat),
        ]);
        sender.send(&command);
    }

    fn send_get(&mut self, sender: &mut Sender<'_>) {
        let mut command = HEADER.to_vec();
        command.extend_from_slice(&[GET_POSITION, 0x02, 0x00, 0x00]);
        sender.send(&command);
    }

    fn get(&self, parameters: &mut Parameters) {
        parameters.set_byte("position.blinds", self.blinds);
        parameters.set_byte("position.slat", self.slat);
    }

    fn on_command(&mut self, node: &mut Node, command: &[u8], _sender: &mut Sender<'_>) {
        let Some((header, [REPORT_POSITION, flags, blinds, slat, ..])) = command.split_first_chunk::<4>() else {
            return;
        };
        if *header != HEADER {
            return;
        }
        if flags & BLINDS != 0 {
            self.blinds = *blinds;
        }
        if flags & SLAT != 0 {
            self.slat = *slat;
        }
        tracing::debug!(node = node.id, blinds = self.blinds, slat = self.slat, "position report");
    }
}

#[derive(Debug, Default)]
pub struct Fgr222Config {
    slat_time: u16,
}

impl CommandHandler for Fgr222Config {
    fn send_set(&mut self, sender: &mut Sender<'_>, parameters: &Parameters) {
        if let Some(slat_time) = parameters.get_word("config.slatTime") {
            // not reported back by the device
            self.slat_time = slat_time;
            configuration::send_value(sender, SLAT_TIME, ConfigValue::Word(slat_time));
        } else if parameters.contains("config.calibrate") {
            configuration::send_value(sender, CALIBRATE, ConfigValue::Byte(1));
        }
    }

    fn send_get(&mut self, sender: &mut Sender<'_>) {
        configuration::send_get_register(sender, SLAT_TIME);
    }

    fn get(&self, parameters: &mut Parameters) {
        parameters.set_word("config.slatTime", self.slat_time);
    }

    fn on_command(&mut self, node: &mut Node, command: &[u8], _sender: &mut Sender<'_>) {
        if let Some((SLAT_TIME, ConfigValue::Word(value))) = configuration::parse_report(command) {
            tracing::debug!(node = node.id, slat_time = value, "slat time report");
            self.slat_time = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zwave::command::configuration::{GET, REPORT, SET};
    use crate::zwave::command::tests::sent;
    use crate::zwave::protocol::ZWaveProtocol;

    fn set_position(flags: u8, blinds: u8, slat: u8) -> Vec<u8> {
        vec![MANUFACTURER_PROPRIETARY, 0x01, 0x0f, 0x26, 0x01, flags, blinds, slat]
    }

    #[tokio::test]
    async fn test_closed_blinds_with_slat_angle_are_nudged_open() {
        let mut protocol = ZWaveProtocol::default();
        let mut shutter = Fgr222::default();
        let mut sender = Sender::new(&mut protocol, 5);
        shutter.send_set(
            &mut sender,
            &Parameters::from_iter([("position.blinds", "0"), ("position.slat", "40")]),
        );
        assert_eq!(sent(&protocol), vec![set_position(0x03, 1, 40)]);
    }

    #[tokio::test]
    async fn test_set_position_partial_uses_tracked_values() {
        let mut protocol = ZWaveProtocol::default();
        let mut node = Node::new(5);
        let mut shutter = Fgr222::default();
        let mut sender = Sender::new(&mut protocol, 5);
        shutter.on_command(
            &mut node,
            &[MANUFACTURER_PROPRIETARY, 0x01, 0x0f, 0x26, 0x03, 0x03, 60, 20],
            &mut sender,
        );
        shutter.send_set(&mut sender, &Parameters::from_iter([("position.blinds", "0")]));
        shutter.send_set(&mut sender, &Parameters::from_iter([("position.slat", "5")]));
        shutter.send_set(&mut sender, &Parameters::from_iter([("state", "on")]));
        assert_eq!(sent(&protocol), vec![set_position(0x02, 0, 20), set_position(0x01, 60, 5)]);
    }

    #[tokio::test]
    async fn test_position_report_honours_flags() {
        let mut protocol = ZWaveProtocol::default();
        let mut node = Node::new(5);
        let mut shutter = Fgr222::default();
        let mut sender = Sender::new(&mut protocol, 5);
        shutter.on_command(
            &mut node,
            &[MANUFACTURER_PROPRIETARY, 0x01, 0x0f, 0x26, 0x03, 0x02, 75, 99],
            &mut sender,
        );
        // foreign proprietary command
        shutter.on_command(
            &mut node,
            &[MANUFACTURER_PROPRIETARY, 0x02, 0x0f, 0x26, 0x03, 0x03, 1, 1],
            &mut sender,
        );
        let mut parameters = Parameters::new();
        shutter.get(&mut parameters);
        assert_eq!(parameters.get("position.blinds"), Some("75"));
        assert_eq!(parameters.get("position.slat"), Some("0"));
    }

    #[tokio::test]
    async fn test_slat_time_report() {
        let mut protocol = ZWaveProtocol::default();
        let mut node = Node::new(5);
        let mut config = Fgr222Config::default();
        let mut sender = Sender::new(&mut protocol, 5);
        config.on_command(&mut node, &[CONFIGURATION, REPORT, 12, 2, 0x00, 0x1e], &mut sender);
        let mut parameters = Parameters::new();
        config.get(&mut parameters);
        assert_eq!(parameters, Parameters::from_iter([("config.slatTime", "30")]));
    }

    #[tokio::test]
    async fn test_config_set_and_calibrate() {
        let mut protocol = ZWaveProtocol::default();
        let mut config = Fgr222Config::default();
        let mut sender = Sender::new(&mut protocol, 5);
        config.send_set(&mut sender, &Parameters::from_iter([("config.slatTime", "300")]));
        config.send_set(&mut sender, &Parameters::from_iter([("config.calibrate", "")]));
        config.send_set(&mut sender, &Parameters::from_iter([("dim", "3")]));
        config.send_get(&mut sender);
        assert_eq!(
            sent(&protocol),
            vec![
                vec![CONFIGURATION, SET, SLAT_TIME, 2, 0x01, 0x2c],
                vec![CONFIGURATION, SET, CALIBRATE, 1, 1],
                vec![CONFIGURATION, GET, SLAT_TIME],
            ]
        );
        let mut parameters = Parameters::new();
        config.get(&mut parameters);
        assert_eq!(parameters.get("config.slatTime"), Some("300"));
    }
}
