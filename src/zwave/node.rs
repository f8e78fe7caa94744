use super::protocol::{Request, ZWaveProtocol};
use crate::parameters::Parameters;
use std::collections::BTreeMap;
use std::fmt;

/// Number of addressable nodes; node ids are one byte.
pub const NODE_COUNT: usize = 256;

/// State and encoding rules of one command class on one node.
///
/// Handlers live in [`Node::handlers`] keyed by class id. Installing a handler
/// for a class that already has one replaces it, which is how vendor drivers
/// take over from the generic implementations.
pub trait CommandHandler: fmt::Debug + Send {
    /// Sends set commands for every recognized key in `parameters`. Sends
    /// nothing when no key is relevant for this class.
    fn send_set(&mut self, sender: &mut Sender<'_>, parameters: &Parameters);

    /// Sends the get command(s) that make the device report its state.
    fn send_get(&mut self, sender: &mut Sender<'_>);

    /// Writes the tracked state into `parameters`.
    fn get(&self, parameters: &mut Parameters);

    /// Handles a command of this class sent by the node. `command` starts
    /// with the class id.
    fn on_command(&mut self, node: &mut Node, command: &[u8], sender: &mut Sender<'_>);
}

/// Sends commands to one node, wrapped in `SendData` requests.
pub struct Sender<'a> {
    protocol: &'a mut ZWaveProtocol,
    node: u8,
}

impl<'a> Sender<'a> {
    pub fn new(protocol: &'a mut ZWaveProtocol, node: u8) -> Self {
        Self { protocol, node }
    }

    pub fn node(&self) -> u8 {
        self.node
    }

    pub fn send(&mut self, command: &[u8]) {
        self.protocol.submit(Request::send_data(self.node, command));
    }
}

#[derive(Debug, Default)]
pub struct Node {
    pub id: u8,
    pub name: String,
    /// Model name, known once a vendor driver has been matched.
    pub device_name: Option<String>,
    pub handlers: BTreeMap<u8, Box<dyn CommandHandler>>,
}

impl Node {
    pub fn new(id: u8) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn is_discovered(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Installs `handler` for `class`, replacing any existing one.
    pub fn install(&mut self, class: u8, handler: Box<dyn CommandHandler>) {
        self.handlers.insert(class, handler);
    }

    /// Installs `handler` only if the class has no handler yet.
    pub fn install_default(&mut self, class: u8, handler: Box<dyn CommandHandler>) -> bool {
        match self.handlers.entry(class) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(handler);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn send_set(&mut self, sender: &mut Sender<'_>, parameters: &Parameters) {
        for handler in self.handlers.values_mut() {
            handler.send_set(sender, parameters);
        }
    }

    pub fn send_get(&mut self, sender: &mut Sender<'_>) {
        for handler in self.handlers.values_mut() {
            handler.send_get(sender);
        }
    }

    pub fn get(&self, parameters: &mut Parameters) {
        parameters.insert("node.name", self.name.as_str());
        if let Some(device_name) = &self.device_name {
            parameters.insert("device.name", device_name.as_str());
        }
        for handler in self.handlers.values() {
            handler.get(parameters);
        }
    }

    /// Routes a command to the handler of its class. The handler is taken out
    /// of the map for the call so it may install other handlers on the node;
    /// it goes back unless it was replaced meanwhile.
    pub fn dispatch(&mut self, command: &[u8], sender: &mut Sender<'_>) -> bool {
        let Some(&class) = command.first() else {
            return false;
        };
        let Some(mut handler) = self.handlers.remove(&class) else {
            tracing::debug!(node = self.id, class, "no handler for command class");
            return false;
        };
        handler.on_command(self, command, sender);
        self.handlers.entry(class).or_insert(handler);
        true
    }
}

/// Fixed table of all nodes, indexed by node id.
#[derive(Debug)]
pub struct NodeTable {
    nodes: Vec<Node>,
}

impl Default for NodeTable {
    fn default() -> Self {
        Self {
            nodes: (0..NODE_COUNT).map(|id| Node::new(id as u8)).collect(),
        }
    }
}

impl NodeTable {
    /// Node for an id from the HTTP side; `None` when outside the address space.
    pub fn lookup(&self, id: u32) -> Option<&Node> {
        usize::try_from(id).ok().and_then(|i| self.nodes.get(i))
    }

    pub fn lookup_mut(&mut self, id: u32) -> Option<&mut Node> {
        usize::try_from(id).ok().and_then(|i| self.nodes.get_mut(i))
    }

    pub fn node(&self, id: u8) -> &Node {
        &self.nodes[usize::from(id)]
    }

    pub fn node_mut(&mut self, id: u8) -> &mut Node {
        &mut self.nodes[usize::from(id)]
    }

    pub fn discovered(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_discovered())
    }
}
