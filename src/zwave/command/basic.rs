use crate::parameters::Parameters;
use crate::zwave::class::BASIC;
use crate::zwave::node::{CommandHandler, Node, Sender};

pub const SET: u8 = 0x01;
pub const GET: u8 = 0x02;
pub const REPORT: u8 = 0x03;

const OFF: u8 = 0x00;
const ON: u8 = 0xff;

/// `COMMAND_CLASS_BASIC`: on/off and dim level.
#[derive(Debug, Default)]
pub struct Basic {
    value: Option<u8>,
}

impl CommandHandler for Basic {
    fn send_set(&mut self, sender: &mut Sender<'_>, parameters: &Parameters) {
        let value = match (parameters.get_percentage("dim"), parameters.get_state("state")) {
            (Some(dim), _) => dim,
            (None, Some(true)) => ON,
            (None, Some(false)) => OFF,
            (None, None) => return,
        };
        sender.send(&[BASIC, SET, value]);
    }

    fn send_get(&mut self, sender: &mut Sender<'_>) {
        sender.send(&[BASIC, GET]);
    }

    fn get(&self, parameters: &mut Parameters) {
        match self.value {
            Some(value @ (OFF | ON)) => parameters.set_state("state", value == ON),
            Some(dim) => parameters.set_percentage("dim", dim),
            None => {}
        }
    }

    fn on_command(&mut self, node: &mut Node, command: &[u8], _sender: &mut Sender<'_>) {
        if let [_, REPORT, value, ..] = *command {
            tracing::debug!(node = node.id, value, "basic report");
            self.value = Some(value);
        }
    }
}
