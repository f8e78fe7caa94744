//! Transport-independent view of a device network and the channel used by
//! the web handlers to reach the task that owns it.

use crate::link::LinkError;
use crate::parameters::Parameters;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// A device network driven by one serial link.
///
/// All methods are synchronous; the link driver calls them from the single
/// task that owns the network and moves bytes between it and the port.
pub trait Network: Send {
    /// Category reported with link errors, e.g. `"zwave"`.
    fn transport(&self) -> &'static str;

    /// Applies `parameters` to a node. Returns false if the node is unknown.
    fn set(&mut self, node: u32, parameters: &Parameters) -> bool;

    /// Fills `parameters` with the node's state. Returns false if the node is
    /// unknown; the node name may still have been written.
    fn get(&self, node: u32, parameters: &mut Parameters) -> bool;

    fn receive(&mut self, bytes: &[u8]);

    fn on_timeout(&mut self);

    fn deadline(&self) -> Option<Instant>;

    fn take_output(&mut self) -> Vec<u8>;

    /// The serial port failed or reached end of file. Called once, before
    /// [`Network::close`].
    fn on_transport_error(&mut self, error: &LinkError);

    /// The link is gone; every pending request fails.
    fn close(&mut self);
}

/// Request sent from a web handler to a network task.
#[derive(Debug)]
pub enum NetworkRequest {
    Set {
        node: u32,
        parameters: Parameters,
        respond_to: oneshot::Sender<bool>,
    },
    Get {
        node: u32,
        /// `None` if the node is unknown.
        respond_to: oneshot::Sender<Option<Parameters>>,
    },
}

impl NetworkRequest {
    /// Runs the request against `network` and answers the caller.
    pub fn apply<N: Network + ?Sized>(self, network: &mut N) {
        match self {
            NetworkRequest::Set { node, parameters, respond_to } => {
                let _ = respond_to.send(network.set(node, &parameters));
            }
            NetworkRequest::Get { node, respond_to } => {
                let mut parameters = Parameters::new();
                let found = network.get(node, &mut parameters);
                let _ = respond_to.send(found.then_some(parameters));
            }
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("network task is not running")]
pub struct NetworkGone;

/// Cloneable sending side of a network task's request channel.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    tx: mpsc::Sender<NetworkRequest>,
}

impl NetworkHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NetworkRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn set(&self, node: u32, parameters: Parameters) -> Result<bool, NetworkGone> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(NetworkRequest::Set { node, parameters, respond_to })
            .await
            .map_err(|_| NetworkGone)?;
        response.await.map_err(|_| NetworkGone)
    }

    pub async fn get(&self, node: u32) -> Result<Option<Parameters>, NetworkGone> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(NetworkRequest::Get { node, respond_to })
            .await
            .map_err(|_| NetworkGone)?;
        response.await.map_err(|_| NetworkGone)
    }
}
